//! Revertscope: revert-constraint reconstruction for decompiled EVM contracts.
//!
//! Takes the three-address code (TAC) control-flow graph a decompiler lifted
//! from a contract, plus the facts its analyses derived, and works out for
//! every reverting block the branch condition that leads into it and the
//! error message it reverts with.

pub mod core;
pub mod utils;

pub mod driver;
pub mod errors;
pub mod expr;
pub mod loader;
pub mod message;
pub mod phi;
pub mod prettify;
pub mod program;
pub mod report;
pub mod resolver;
