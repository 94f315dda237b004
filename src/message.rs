//! Revert message recovery.
//!
//! Solidity builds `Error(string)` revert data either by copying the string
//! out of the code section (`CODECOPY`) or by storing it word by word with
//! constant `MSTORE`s. Both shapes are recognised here.

use crate::loader::Facts;
use crate::program::{Block, Statement};
use crate::utils::helpers::strip_nul;
use crate::utils::opcodes::Opcode;
use primitive_types::U256;
use serde::Serialize;

/// Hex prefix of a word holding the `Error(string)` selector `0x08c379a0`.
pub const ERROR_SELECTOR_PREFIX: &str = "8c379a";

/// What the extractor found for one revert block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Message {
    Found(String),
    /// Neither heuristic matched.
    Absent,
    /// A heuristic matched but the bytes could not be recovered.
    Unhandled(String),
}

impl Message {
    pub fn text(&self) -> Option<&str> {
        match self {
            Message::Found(t) => Some(t),
            _ => None,
        }
    }
}

/// Extract the revert message of `block` from its statements and the code image.
pub fn extract_message(block: &Block, facts: &Facts, code: &[u8]) -> Message {
    if let Some(copy) = block.statements.iter().find(|s| s.op == Opcode::CodeCopy) {
        return code_copy_message(copy, facts, code);
    }

    let mut text = String::new();
    let mut found = false;
    for stmt in block.statements.iter().filter(|s| s.op == Opcode::MStore) {
        let Some(word) = stmt.operands.get(1).and_then(|v| facts.known_value(v)) else {
            continue;
        };
        if !is_message_word(word) {
            continue;
        }
        match String::from_utf8(strip_nul(&word_bytes(word))) {
            Ok(fragment) => {
                text.push_str(&fragment);
                found = true;
            }
            Err(_) => log::warn!("{}: skipping non-UTF-8 message fragment 0x{word:x}", stmt.id),
        }
    }

    if found {
        Message::Found(text)
    } else {
        Message::Absent
    }
}

/// `CODECOPY dest, offset, length`: the message is `code[offset..offset+length]`.
fn code_copy_message(stmt: &Statement, facts: &Facts, code: &[u8]) -> Message {
    let constant = |idx: usize| stmt.operands.get(idx).and_then(|v| facts.known_value(v));
    let (Some(offset), Some(length)) = (constant(1), constant(2)) else {
        return Message::Unhandled(format!("{}: CODECOPY offset or length is not constant", stmt.id));
    };

    let range = to_usize(offset)
        .zip(to_usize(length))
        .and_then(|(start, len)| Some(start..start.checked_add(len)?))
        .filter(|r| r.end <= code.len());
    let Some(range) = range else {
        return Message::Unhandled(format!(
            "{}: CODECOPY range 0x{offset:x}+0x{length:x} is outside the code",
            stmt.id
        ));
    };

    match String::from_utf8(strip_nul(&code[range])) {
        Ok(text) => Message::Found(text),
        Err(_) => {
            log::warn!("{}: copied message is not valid UTF-8", stmt.id);
            Message::Unhandled(format!("{}: message bytes are not valid UTF-8", stmt.id))
        }
    }
}

/// A stored word that looks like message text rather than the selector or a
/// small ABI offset/length.
fn is_message_word(word: U256) -> bool {
    let hex = format!("{word:x}");
    !hex.starts_with(ERROR_SELECTOR_PREFIX) && hex.len() > 2
}

fn word_bytes(word: U256) -> [u8; 32] {
    let mut buf = [0u8; 32];
    word.to_big_endian(&mut buf);
    buf
}

fn to_usize(v: U256) -> Option<usize> {
    if v > U256::from(usize::MAX) {
        None
    } else {
        Some(v.as_usize())
    }
}
