//! Domain-specific error types.
//!
//! Uses `thiserror` for structured error definitions; the binary wraps them
//! in `anyhow` with context.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading the bytecode image, fact files or the CFG.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid hex input: {0}")]
    InvalidHex(String),

    #[error("{file}:{line}: expected at least {expected} fields, found {found}")]
    ShortRow {
        file: String,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("{file}: malformed record: {reason}")]
    MalformedRecord { file: String, reason: String },

    #[error("invalid constant {value:?} for variable {var}")]
    InvalidConstant { var: String, value: String },

    #[error("unknown opcode {0:?}")]
    UnknownOpcode(String),

    #[error("malformed CFG: {0}")]
    MalformedCfg(String),

    #[error("duplicate block id {0}")]
    DuplicateBlock(String),

    #[error("block {block} references unknown block {target}")]
    UnknownBlockRef { block: String, target: String },

    #[error("edge {from} -> {to} is not mirrored in the predecessor/successor lists")]
    InconsistentEdge { from: String, to: String },

    #[error("block {block}: control transfer {stmt} is not the last statement")]
    MisplacedControlTransfer { block: String, stmt: String },

    #[error("statement {0} defines more than one variable")]
    MultipleDefinitions(String),
}

/// Structural failures raised while resolving a revert constraint.
///
/// "Cannot fully resolve" is never an error: the resolver degrades to opaque
/// tokens for that. These are the cases where no progress is possible at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unknown block {0}")]
    UnknownBlock(String),

    #[error("block {0} has no predecessor")]
    NoPredecessor(String),

    #[error("block {block}: predecessor {pred} does not end in a conditional branch")]
    NoConditionalBranch { block: String, pred: String },

    #[error("statement {stmt}: {reason}")]
    MalformedStatement { stmt: String, reason: String },
}

/// Default bound on recursion depth per top-level resolution.
pub const DEFAULT_MAX_DEPTH: usize = 64;
