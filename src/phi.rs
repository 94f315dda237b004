//! Phi-merge resolution.
//!
//! The lifter's `PHI` statements do not say which operand flows in from which
//! predecessor. For the common two-way join we correlate operands with
//! predecessors heuristically, then look for the conditional branch that
//! selects between the two paths and use its condition as the merge guard.
//! Wider joins, and two-way joins whose operands could only be split
//! heuristically, are reported as [`Expression::Unsupported`].

use crate::core::ident;
use crate::errors::ResolveError;
use crate::expr::Expression;
use crate::program::{BlockIdx, Statement};
use crate::resolver::{Note, Search};
use std::collections::HashSet;

/// Operands of a phi split by the predecessor they are believed to come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhiGroups<'s> {
    /// Operands correlated with predecessor 0.
    pub first: Vec<&'s str>,
    /// Operands correlated with predecessor 1.
    pub second: Vec<&'s str>,
}

impl<'a> Search<'a> {
    pub(crate) fn resolve_phi(
        &mut self,
        phi: &Statement,
        block: BlockIdx,
        depth: usize,
    ) -> Result<Expression, ResolveError> {
        let program = self.resolver.program;
        let def = phi.def().ok_or_else(|| ResolveError::MalformedStatement {
            stmt: phi.id.clone(),
            reason: "PHI defines no variable".to_string(),
        })?;
        let preds = program.block(block).predecessors();

        let (first_pred, second_pred) = match preds {
            [] => return Ok(Expression::input(def)),
            [only] => {
                let alts = self.resolve_all(phi.operands.as_slice(), *only, depth)?;
                return Ok(Expression::any(alts).unwrap_or_else(|| Expression::input(def)));
            }
            [a, b, ..] => (*a, *b),
        };

        let groups = self.partition(phi, &program.block(second_pred).id);
        log::debug!(
            "PHI {} in {}: first={:?} second={:?}",
            phi.id,
            program.block(block).id,
            groups.first,
            groups.second
        );
        let first = self.resolve_all(groups.first.as_slice(), first_pred, depth)?;
        let second = self.resolve_all(groups.second.as_slice(), second_pred, depth)?;

        let (on_true, on_false) = match (Expression::any(first), Expression::any(second)) {
            (None, None) => return Ok(Expression::input(def)),
            (Some(e), None) | (None, Some(e)) => return Ok(e),
            (Some(a), Some(b)) => (a, b),
        };

        if preds.len() > 2 {
            self.note(Note::UnsupportedPhi {
                stmt: phi.id.clone(),
                block: program.block(block).id.clone(),
            });
            let reason = format!(
                "PHI {} joins {} predecessors with {} operands",
                phi.id,
                preds.len(),
                phi.operands.len()
            );
            return Ok(Expression::unsupported(
                reason,
                Expression::merge(None, on_true, on_false),
            ));
        }

        let guard = self.find_guard(first_pred, depth)?;
        let merged = Expression::merge(guard, on_true, on_false);
        if phi.operands.len() == 2 {
            return Ok(merged);
        }

        self.note(Note::UnsupportedPhi {
            stmt: phi.id.clone(),
            block: program.block(block).id.clone(),
        });
        let reason = format!(
            "PHI {} has {} operands, correlated with predecessors by origin",
            phi.id,
            phi.operands.len()
        );
        Ok(Expression::unsupported(reason, merged))
    }

    /// Correlate phi operands with predecessors 0 and 1.
    ///
    /// Two operands pair positionally. Otherwise each operand's originating
    /// block (or the operand itself, when the origin index has no entry) is
    /// ordered against the second predecessor's id.
    pub(crate) fn partition<'s>(&self, phi: &'s Statement, second_pred: &str) -> PhiGroups<'s> {
        let mut groups = PhiGroups::default();
        if let [a, b] = phi.operands.as_slice() {
            groups.first.push(a);
            groups.second.push(b);
            return groups;
        }
        let facts = self.resolver.facts;
        for operand in &phi.operands {
            let origin = facts.origin(operand).unwrap_or(operand);
            if ident::precedes_second_pred(origin, second_pred) {
                groups.first.push(operand);
            } else {
                groups.second.push(operand);
            }
        }
        groups
    }

    fn resolve_all<S: AsRef<str>>(
        &mut self,
        vars: &[S],
        block: BlockIdx,
        depth: usize,
    ) -> Result<Vec<Expression>, ResolveError> {
        let mut out = Vec::with_capacity(vars.len());
        for v in vars {
            out.push(self.resolve(v.as_ref(), block, depth + 1)?);
        }
        Ok(out)
    }

    /// Walk first predecessors back from `start` to the nearest block ending
    /// in a conditional branch and resolve its condition there.
    fn find_guard(&mut self, start: BlockIdx, depth: usize) -> Result<Option<Expression>, ResolveError> {
        let program = self.resolver.program;
        let mut seen = HashSet::new();
        let mut current = start;
        while seen.insert(current) {
            let block = program.block(current);
            if let Some(cond) = block.terminal().and_then(Statement::branch_condition) {
                return self.resolve(cond, current, depth + 1).map(Some);
            }
            match block.predecessors().first() {
                Some(p) => current = *p,
                None => break,
            }
        }
        log::debug!("no guarding branch above {}", program.block(start).id);
        Ok(None)
    }
}
