//! Backward symbolic resolution of TAC variables.
//!
//! A variable is resolved by scanning its block bottom-up for the statement
//! that defines it, rebuilding that statement as an [`Expression`] (operands
//! first), and, when the block has no definer, continuing in the block the
//! origin index names or in the predecessors.
//!
//! Memory and storage are not modelled: loads become opaque references and
//! stores passed over during a scan are recorded as [`Note`]s, which is how a
//! constraint gets marked as possibly incomplete.

use crate::core::ident;
use crate::core::masks::is_full_width_mask;
use crate::errors::{ResolveError, DEFAULT_MAX_DEPTH};
use crate::expr::{Confidence, Expression};
use crate::loader::Facts;
use crate::program::{BlockIdx, Program, Statement};
use crate::utils::opcodes::Opcode;
use std::collections::HashMap;
use std::fmt;

/// Marker substituted for results of calls the resolver does not follow.
pub const EXTERNAL_CALL: &str = "externalCall";

/// A reason why a resolved expression may not be the whole story.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Note {
    /// An unmodelled memory/storage access or call was involved.
    Encounter { op: Opcode, stmt: String },
    /// The search stopped on a cycle or at the depth limit.
    GaveUp { var: String, block: String },
    /// A phi join with a fan-in the merge rules do not cover.
    UnsupportedPhi { stmt: String, block: String },
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Note::Encounter { op, .. } => {
                let what = match op {
                    Opcode::CallPrivate => "PRIVATE CALL".to_string(),
                    Opcode::StaticCall => "STATIC CALL".to_string(),
                    other => other.name().to_string(),
                };
                write!(f, "encounter {what}, constraint may not be complete.")
            }
            Note::GaveUp { var, block } => {
                write!(f, "gave up on {var} in {block}, constraint may not be complete.")
            }
            Note::UnsupportedPhi { stmt, .. } => {
                write!(f, "encounter unsupported PHI {stmt}, constraint may not be complete.")
            }
        }
    }
}

/// The result of one top-level resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub expr: Expression,
    /// Deduplicated, in the order they were first hit.
    pub notes: Vec<Note>,
}

impl Resolution {
    pub fn is_incomplete(&self) -> bool {
        !self.notes.is_empty() || self.expr.confidence() == Confidence::Degraded
    }
}

/// Resolves variables of one program against one set of facts.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    pub(crate) program: &'a Program,
    pub(crate) facts: &'a Facts,
    pub(crate) max_depth: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(program: &'a Program, facts: &'a Facts) -> Self {
        Self {
            program,
            facts,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Bound the recursion depth of a single resolution. Both operand
    /// recursion and moves into another block count one level.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Resolve `var` as seen at the end of `block`.
    pub fn resolve(&self, var: &str, block: BlockIdx) -> Result<Resolution, ResolveError> {
        let mut search = Search::new(*self);
        let expr = search.resolve(var, block, 0)?;
        Ok(search.finish(expr))
    }

    /// Resolve the value a phi statement in `block` produces.
    pub fn resolve_phi(&self, phi: &Statement, block: BlockIdx) -> Result<Resolution, ResolveError> {
        let mut search = Search::new(*self);
        let expr = search.resolve_phi(phi, block, 0)?;
        Ok(search.finish(expr))
    }
}

enum Visit {
    InProgress,
    Done(Expression),
}

/// State of one top-level resolution: the visited table keyed by
/// `(variable, block)` and the notes gathered so far.
pub(crate) struct Search<'a> {
    pub(crate) resolver: Resolver<'a>,
    visited: HashMap<(String, BlockIdx), Visit>,
    notes: Vec<Note>,
}

impl<'a> Search<'a> {
    fn new(resolver: Resolver<'a>) -> Self {
        Self {
            resolver,
            visited: HashMap::new(),
            notes: Vec::new(),
        }
    }

    fn finish(self, expr: Expression) -> Resolution {
        Resolution {
            expr,
            notes: self.notes,
        }
    }

    pub(crate) fn note(&mut self, note: Note) {
        if !self.notes.contains(&note) {
            self.notes.push(note);
        }
    }

    fn give_up(&mut self, var: &str, block: BlockIdx) -> Expression {
        let block = self.resolver.program.block(block).id.clone();
        log::debug!("giving up on {var} in {block}");
        self.note(Note::GaveUp {
            var: var.to_string(),
            block,
        });
        Expression::Unresolved(var.to_string())
    }

    /// Values the upstream analyses already know, independent of block.
    fn known(&self, var: &str) -> Option<Expression> {
        let facts = self.resolver.facts;
        if let Some(v) = facts.known_value(var) {
            return Some(Expression::Constant(v));
        }
        facts
            .storage_slot(var)
            .or_else(|| facts.storage_slot(&ident::statement_spelling(var)))
            .map(Expression::storage)
    }

    pub(crate) fn resolve(
        &mut self,
        var: &str,
        block: BlockIdx,
        depth: usize,
    ) -> Result<Expression, ResolveError> {
        if let Some(e) = self.known(var) {
            return Ok(e);
        }

        let key = (var.to_string(), block);
        match self.visited.get(&key) {
            Some(Visit::Done(e)) => return Ok(e.clone()),
            Some(Visit::InProgress) => return Ok(self.give_up(var, block)),
            None => {}
        }
        if depth > self.resolver.max_depth {
            return Ok(self.give_up(var, block));
        }

        self.visited.insert(key.clone(), Visit::InProgress);
        let expr = match self.scan_block(var, block, depth)? {
            Some(e) => e,
            None => self.resolve_elsewhere(var, block, depth)?,
        };
        self.visited.insert(key, Visit::Done(expr.clone()));
        Ok(expr)
    }

    /// Bottom-up scan of `block` for the definer of `var`.
    fn scan_block(
        &mut self,
        var: &str,
        block: BlockIdx,
        depth: usize,
    ) -> Result<Option<Expression>, ResolveError> {
        let program = self.resolver.program;
        for stmt in program.block(block).statements.iter().rev() {
            if stmt.op.is_control_transfer() {
                continue;
            }
            if stmt.op.is_untracked_store() {
                self.note(Note::Encounter {
                    op: stmt.op,
                    stmt: stmt.id.clone(),
                });
                continue;
            }
            if stmt.defines(var) {
                return self.interpret(stmt, block, depth).map(Some);
            }
        }
        Ok(None)
    }

    /// Rebuild the value defined by `stmt`.
    fn interpret(
        &mut self,
        stmt: &Statement,
        block: BlockIdx,
        depth: usize,
    ) -> Result<Expression, ResolveError> {
        match stmt.op {
            Opcode::MLoad => {
                self.note(Note::Encounter {
                    op: stmt.op,
                    stmt: stmt.id.clone(),
                });
                let addr = operand(stmt, 0)?;
                let tag = match self.resolver.facts.known_value(addr) {
                    Some(v) => format!("0x{v:x}"),
                    None => addr.to_string(),
                };
                Ok(Expression::MemoryRef(tag))
            }
            // Known constants never get here; this one was not folded.
            Opcode::Const => Ok(Expression::input(stmt.def().unwrap_or(&stmt.id))),
            Opcode::Phi => self.resolve_phi(stmt, block, depth),
            op if op.is_opaque_call() => {
                self.note(Note::Encounter {
                    op,
                    stmt: stmt.id.clone(),
                });
                Ok(Expression::call(EXTERNAL_CALL, vec![]))
            }
            Opcode::CallDataLoad => {
                let offset = self.resolve(operand(stmt, 0)?, block, depth + 1)?;
                Ok(Expression::OpaqueInput(format!("CALLDATALOAD_{offset}")))
            }
            op => {
                let mut args = Vec::with_capacity(stmt.operands.len());
                for o in &stmt.operands {
                    args.push(self.resolve(o, block, depth + 1)?);
                }
                Ok(build_node(op, args))
            }
        }
    }

    /// `var` has no definer in `block`: follow the origin index, else every
    /// predecessor. Among predecessor results the last informative one wins.
    fn resolve_elsewhere(
        &mut self,
        var: &str,
        block: BlockIdx,
        depth: usize,
    ) -> Result<Expression, ResolveError> {
        let program = self.resolver.program;
        let facts = self.resolver.facts;

        let origin = facts
            .origin(var)
            .or_else(|| ident::base_name(var).and_then(|base| facts.origin(base)));
        if let Some(origin_id) = origin {
            match program.find(origin_id) {
                Some(b) if b != block => return self.resolve(var, b, depth + 1),
                Some(_) => {}
                None => log::warn!("{var}: origin block {origin_id} is not in the CFG"),
            }
        }

        let mut chosen = None;
        let mut gave_up = false;
        for pred in program.block(block).predecessors() {
            log::debug!(
                "{var}: recursing from {} into {}",
                program.block(block).id,
                program.block(*pred).id
            );
            let e = self.resolve(var, *pred, depth + 1)?;
            match e {
                Expression::Unresolved(ref t) if t == var => gave_up = true,
                ref e if e.is_opaque_token(var) => {}
                e => chosen = Some(e),
            }
        }

        Ok(chosen.unwrap_or_else(|| {
            if gave_up {
                Expression::Unresolved(var.to_string())
            } else {
                Expression::input(var)
            }
        }))
    }
}

pub(crate) fn operand(stmt: &Statement, idx: usize) -> Result<&str, ResolveError> {
    stmt.operands
        .get(idx)
        .map(String::as_str)
        .ok_or_else(|| ResolveError::MalformedStatement {
            stmt: stmt.id.clone(),
            reason: format!("{} is missing operand {idx}", stmt.op),
        })
}

/// Combine resolved operands into the node for `op`.
pub fn build_node(op: Opcode, mut args: Vec<Expression>) -> Expression {
    if op == Opcode::And && args.len() == 2 {
        let is_mask = |e: &Expression| e.as_constant().is_some_and(is_full_width_mask);
        if is_mask(&args[0]) {
            return args.swap_remove(1);
        }
        if is_mask(&args[1]) {
            return args.swap_remove(0);
        }
    }

    if op.is_operator() {
        match args.len() {
            2 => {
                let r = args.pop();
                let l = args.pop();
                if let (Some(l), Some(r)) = (l, r) {
                    return Expression::binary(op, l, r);
                }
            }
            1 => {
                if let Some(e) = args.pop() {
                    return Expression::unary(op, e);
                }
            }
            _ => {}
        }
    }

    Expression::OpaqueCall(op.name().to_string(), args)
}
