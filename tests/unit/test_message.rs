//! Unit tests for revert message recovery.

use primitive_types::U256;
use revertscope::loader::Facts;
use revertscope::message::{extract_message, Message};
use revertscope::program::{Program, ProgramBuilder, Statement};
use revertscope::utils::opcodes::Opcode;

fn revert_block(stmts: Vec<Statement>) -> Program {
    ProgramBuilder::new().block("B1", stmts).build().unwrap()
}

/// A memory word holding `text` left-aligned, as Solidity stores strings.
fn word(text: &[u8]) -> U256 {
    let mut buf = [0u8; 32];
    buf[..text.len()].copy_from_slice(text);
    U256::from_big_endian(&buf)
}

fn mstore(id: &str, addr: &str, value: &str) -> Statement {
    Statement::new(id, Opcode::MStore, &[], &[addr, value])
}

fn codecopy() -> Statement {
    Statement::new("S1", Opcode::CodeCopy, &[], &["V1", "V2", "V3"])
}

#[test]
fn test_code_copy_message() {
    let p = revert_block(vec![codecopy()]);
    let facts = Facts::default()
        .with_known("V1", U256::from(0x20u64))
        .with_known("V2", U256::from(0x20u64))
        .with_known("V3", U256::from(0x05u64));
    let mut code = vec![0u8; 0x20];
    code.extend_from_slice(b"ERRORtrailing");
    let msg = extract_message(p.block_by_id("B1").unwrap(), &facts, &code);
    assert_eq!(msg, Message::Found("ERROR".into()));
    assert_eq!(msg.text(), Some("ERROR"));
}

#[test]
fn test_code_copy_out_of_range() {
    let p = revert_block(vec![codecopy()]);
    let facts = Facts::default()
        .with_known("V1", U256::zero())
        .with_known("V2", U256::from(0x10u64))
        .with_known("V3", U256::from(0x40u64));
    let msg = extract_message(p.block_by_id("B1").unwrap(), &facts, &[0u8; 0x20]);
    assert!(matches!(msg, Message::Unhandled(_)));
}

#[test]
fn test_code_copy_unknown_length() {
    let p = revert_block(vec![codecopy()]);
    let facts = Facts::default().with_known("V2", U256::zero());
    let msg = extract_message(p.block_by_id("B1").unwrap(), &facts, b"whatever");
    assert!(matches!(msg, Message::Unhandled(_)));
}

#[test]
fn test_code_copy_invalid_utf8() {
    let p = revert_block(vec![codecopy()]);
    let facts = Facts::default()
        .with_known("V1", U256::zero())
        .with_known("V2", U256::zero())
        .with_known("V3", U256::from(2u64));
    let msg = extract_message(p.block_by_id("B1").unwrap(), &facts, &[0xff, 0xfe]);
    assert!(matches!(msg, Message::Unhandled(_)));
}

#[test]
fn test_mstore_message_skips_selector_and_abi_words() {
    let p = revert_block(vec![
        mstore("S1", "A0", "W0"),
        mstore("S2", "A1", "W1"),
        mstore("S3", "A2", "W2"),
        mstore("S4", "A3", "W3"),
    ]);
    let facts = Facts::default()
        .with_known("W0", U256::from(0x08c379a0u64) << 224)
        .with_known("W1", U256::from(0x20u64))
        .with_known("W2", U256::from(0x20u64))
        .with_known("W3", word(b"Ownable: caller is not the owner"));
    let msg = extract_message(p.block_by_id("B1").unwrap(), &facts, &[]);
    assert_eq!(msg, Message::Found("Ownable: caller is not the owner".into()));
}

#[test]
fn test_mstore_fragments_concatenate_in_order() {
    let p = revert_block(vec![
        mstore("S1", "A0", "W0"),
        mstore("S2", "A1", "UNKNOWN"),
        mstore("S3", "A2", "W1"),
    ]);
    let facts = Facts::default()
        .with_known("W0", word(b"SafeMath: subtraction "))
        .with_known("W1", word(b"overflow"));
    let msg = extract_message(p.block_by_id("B1").unwrap(), &facts, &[]);
    assert_eq!(msg.text(), Some("SafeMath: subtraction overflow"));
}

#[test]
fn test_non_utf8_fragment_is_skipped() {
    let p = revert_block(vec![mstore("S1", "A0", "W0"), mstore("S2", "A1", "W1")]);
    let facts = Facts::default()
        .with_known("W0", word(&[0xff, 0xfe, 0xfd]))
        .with_known("W1", word(b"paused"));
    let msg = extract_message(p.block_by_id("B1").unwrap(), &facts, &[]);
    assert_eq!(msg, Message::Found("paused".into()));
}

#[test]
fn test_code_copy_takes_precedence() {
    let p = revert_block(vec![mstore("S0", "A0", "W0"), codecopy()]);
    let facts = Facts::default()
        .with_known("W0", word(b"ignored"))
        .with_known("V1", U256::zero())
        .with_known("V2", U256::zero())
        .with_known("V3", U256::from(2u64));
    let msg = extract_message(p.block_by_id("B1").unwrap(), &facts, b"okay");
    assert_eq!(msg, Message::Found("ok".into()));
}

#[test]
fn test_no_message() {
    let p = revert_block(vec![Statement::new("S1", Opcode::Revert, &[], &["V1", "V2"])]);
    let msg = extract_message(p.block_by_id("B1").unwrap(), &Facts::default(), &[]);
    assert_eq!(msg, Message::Absent);
    assert_eq!(msg.text(), None);
}
