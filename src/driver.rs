//! Revert-constraint analysis orchestrator.
//!
//! For every revert block: resolve the branch condition guarding it, extract
//! its message, and record both in one report section. A structural failure
//! on one block is logged and recorded in that block's section; the rest of
//! the batch is unaffected.

use crate::errors::{ResolveError, DEFAULT_MAX_DEPTH};
use crate::loader::{Facts, Inputs};
use crate::message::{extract_message, Message};
use crate::program::Program;
use crate::report::{Constraint, Report, Section};
use crate::resolver::{Resolution, Resolver};
use anyhow::{Context, Result};

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Configuration for an analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Maximum recursion depth per resolution.
    pub max_depth: usize,
    pub format: OutputFormat,
    pub color: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            format: OutputFormat::Text,
            color: false,
        }
    }
}

/// Analyse the revert blocks listed in the loaded facts.
pub fn analyze(inputs: &Inputs, config: &AnalysisConfig) -> Report {
    run(
        &inputs.facts.revert_blocks,
        &inputs.program,
        &inputs.facts,
        &inputs.bytecode,
        config,
    )
}

/// Analyse `revert_blocks` one by one.
pub fn run(
    revert_blocks: &[String],
    program: &Program,
    facts: &Facts,
    bytecode: &[u8],
    config: &AnalysisConfig,
) -> Report {
    let resolver = Resolver::new(program, facts).with_max_depth(config.max_depth);
    let mut report = Report::default();
    let mut done: Vec<&str> = Vec::new();

    for block_id in revert_blocks {
        if done.contains(&block_id.as_str()) {
            continue;
        }
        done.push(block_id);

        let (notes, constraint) = match revert_constraint(&resolver, program, block_id) {
            Ok(res) => {
                let notes = res.notes.iter().map(|n| n.to_string()).collect();
                let incomplete = res.is_incomplete();
                let confidence = res.expr.confidence();
                (notes, Constraint::resolved(res.expr.to_string(), incomplete, confidence))
            }
            Err(e) => {
                log::warn!("revert block {block_id}: {e}");
                (Vec::new(), Constraint::Failed { error: e.to_string() })
            }
        };

        let message = match program.block_by_id(block_id) {
            Some(block) => extract_message(block, facts, bytecode),
            None => Message::Unhandled(format!("unknown block {block_id}")),
        };

        report.sections.push(Section {
            block: block_id.clone(),
            notes,
            constraint,
            message,
        });
    }

    log::info!(
        "analysed {} revert blocks, {} failed",
        report.sections.len(),
        report.failures()
    );
    report
}

/// Resolve the condition of the branch leading into `block_id`.
///
/// A revert block is expected to have exactly one predecessor, ending in the
/// `JUMPI` that selects it; only the first predecessor is consulted.
pub fn revert_constraint(
    resolver: &Resolver<'_>,
    program: &Program,
    block_id: &str,
) -> Result<Resolution, ResolveError> {
    let idx = program
        .find(block_id)
        .ok_or_else(|| ResolveError::UnknownBlock(block_id.to_string()))?;
    let pred = *program
        .block(idx)
        .predecessors()
        .first()
        .ok_or_else(|| ResolveError::NoPredecessor(block_id.to_string()))?;
    let cond = program
        .block(pred)
        .terminal()
        .and_then(|s| s.branch_condition())
        .ok_or_else(|| ResolveError::NoConditionalBranch {
            block: block_id.to_string(),
            pred: program.block(pred).id.clone(),
        })?;

    log::debug!("revert block {block_id}: resolving {cond} in {}", program.block(pred).id);
    resolver.resolve(cond, pred)
}

/// Render a report in the configured format.
pub fn render(report: &Report, config: &AnalysisConfig) -> Result<String> {
    match config.format {
        OutputFormat::Text => Ok(report.render_text(config.color)),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&report.to_json()).context("serialise report to JSON")
        }
    }
}
