//! Integration tests for the per-block analysis loop.

use primitive_types::U256;
use revertscope::driver::{analyze, render, revert_constraint, run, AnalysisConfig, OutputFormat};
use revertscope::loader::{Facts, Inputs};
use revertscope::message::Message;
use revertscope::program::{Program, ProgramBuilder, Statement};
use revertscope::report::Constraint;
use revertscope::resolver::Resolver;
use revertscope::utils::opcodes::Opcode;

fn st(id: &str, op: Opcode, defs: &[&str], ops: &[&str]) -> Statement {
    Statement::new(id, op, defs, ops)
}

fn word(text: &[u8]) -> U256 {
    let mut buf = [0u8; 32];
    buf[..text.len()].copy_from_slice(text);
    U256::from_big_endian(&buf)
}

/// A payable check followed by an owner check:
///
/// B0 --ISZERO(CALLVALUE)--> B2 --CALLER == owner--> B4
///  \-> B1 (revert "no ether")  \-> B3 (revert, message copied from code)
fn contract() -> (Program, Facts, Vec<u8>) {
    let p = ProgramBuilder::new()
        .block(
            "B0",
            vec![
                st("S1", Opcode::CallValue, &["V1"], &[]),
                st("S2", Opcode::IsZero, &["V2"], &["V1"]),
                st("S3", Opcode::JumpI, &[], &["V30", "V2"]),
            ],
        )
        .block(
            "B1",
            vec![
                st("S10", Opcode::MStore, &[], &["V31", "V40"]),
                st("S11", Opcode::MStore, &[], &["V32", "V41"]),
                st("S12", Opcode::Revert, &[], &["V31", "V33"]),
            ],
        )
        .block(
            "B2",
            vec![
                st("S5", Opcode::Caller, &["V3"], &[]),
                st("S4", Opcode::SLoad, &["V4"], &["V34"]),
                st("S6", Opcode::Eq, &["V6"], &["V3", "V4"]),
                st("S7", Opcode::JumpI, &[], &["V35", "V6"]),
            ],
        )
        .block(
            "B3",
            vec![
                st("S20", Opcode::CodeCopy, &[], &["V50", "V51", "V52"]),
                st("S21", Opcode::Revert, &[], &["V31", "V33"]),
            ],
        )
        .block("B4", vec![st("S30", Opcode::Stop, &[], &[])])
        .edge("B0", "B2")
        .edge("B0", "B1")
        .edge("B2", "B4")
        .edge("B2", "B3")
        .build()
        .unwrap();

    let facts = Facts::default()
        .with_known("V40", U256::from(0x08c379a0u64) << 224)
        .with_known("V41", word(b"no ether"))
        .with_known("V34", U256::zero())
        .with_known("V50", U256::zero())
        .with_known("V51", U256::from(4u64))
        .with_known("V52", U256::from(9u64))
        .with_storage("S4", "0x0_0_20")
        .with_revert_block("B1")
        .with_revert_block("B3");

    let mut code = vec![0x60, 0x80, 0x60, 0x40];
    code.extend_from_slice(b"not owner");
    (p, facts, code)
}

#[test]
fn test_contract_report() {
    let (program, facts, bytecode) = contract();
    let inputs = Inputs {
        program,
        facts,
        bytecode,
    };
    let report = analyze(&inputs, &AnalysisConfig::default());
    assert_eq!(report.sections.len(), 2);

    let b1 = report.section("B1").unwrap();
    assert_eq!(b1.constraint.text(), Some("(ISZERO (CALLVALUE))"));
    assert_eq!(b1.message, Message::Found("no ether".into()));

    let b3 = report.section("B3").unwrap();
    assert_eq!(b3.constraint.text(), Some("((CALLER) EQ storage_0x0_0_20)"));
    assert_eq!(b3.message, Message::Found("not owner".into()));
    assert!(b3.notes.is_empty());
}

#[test]
fn test_failing_block_does_not_affect_others() {
    let (program, facts, bytecode) = contract();
    let blocks = vec!["B1".to_string(), "B404".to_string(), "B0".to_string(), "B3".to_string()];
    let report = run(&blocks, &program, &facts, &bytecode, &AnalysisConfig::default());

    assert_eq!(report.sections.len(), 4);
    assert_eq!(report.failures(), 2);
    assert!(report.section("B404").unwrap().constraint.is_failed());
    assert!(matches!(
        report.section("B404").unwrap().message,
        Message::Unhandled(_)
    ));
    match &report.section("B0").unwrap().constraint {
        Constraint::Failed { error } => assert_eq!(error, "block B0 has no predecessor"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        report.section("B3").unwrap().constraint.text(),
        Some("((CALLER) EQ storage_0x0_0_20)")
    );
    assert_eq!(report.sections[0].block, "B1");
}

#[test]
fn test_revert_constraint_directly() {
    let (program, facts, _) = contract();
    let resolver = Resolver::new(&program, &facts);
    let r = revert_constraint(&resolver, &program, "B1").unwrap();
    assert_eq!(r.expr.to_string(), "(ISZERO (CALLVALUE))");
    assert!(revert_constraint(&resolver, &program, "B0").is_err());
}

#[test]
fn test_incomplete_constraint_is_flagged() {
    let p = ProgramBuilder::new()
        .block(
            "B0",
            vec![
                st("S1", Opcode::MLoad, &["V1"], &["V9"]),
                st("S2", Opcode::JumpI, &[], &["V8", "V1"]),
            ],
        )
        .block("B1", vec![])
        .edge("B0", "B1")
        .build()
        .unwrap();
    let facts = Facts::default().with_known("V9", U256::from(0x40u64));
    let report = run(&["B1".to_string()], &p, &facts, &[], &AnalysisConfig::default());
    let s = &report.sections[0];
    assert_eq!(
        s.constraint,
        Constraint::Resolved {
            text: "MLOAD_0x40".into(),
            incomplete: true,
            degraded: false,
        }
    );
    assert_eq!(s.notes, vec!["encounter MLOAD, constraint may not be complete.".to_string()]);
    assert_eq!(s.message, Message::Absent);
}

#[test]
fn test_json_rendering() {
    let (program, facts, bytecode) = contract();
    let inputs = Inputs {
        program,
        facts,
        bytecode,
    };
    let config = AnalysisConfig {
        format: OutputFormat::Json,
        ..AnalysisConfig::default()
    };
    let json = render(&analyze(&inputs, &config), &config).unwrap();
    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(v["failures"], 0);
    assert_eq!(v["sections"][0]["block"], "B1");
    assert_eq!(v["sections"][0]["constraint"]["status"], "resolved");
    assert_eq!(v["sections"][0]["constraint"]["text"], "(ISZERO (CALLVALUE))");
    assert_eq!(v["sections"][0]["message"]["kind"], "found");
    assert_eq!(v["sections"][0]["message"]["text"], "no ether");
}
