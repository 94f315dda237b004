//! Unit tests for fact-file and CFG loading.

use primitive_types::U256;
use revertscope::errors::LoaderError;
use revertscope::loader::{
    load_bytecode, load_inputs, parse_constant, parse_known_values, parse_origins,
    parse_storage_revert, FactPaths, CFG_FILE, KNOWN_VALUES_FILE,
};
use revertscope::program::Program;
use std::fs;

const CFG: &str = r#"{
  "functions": [{"id": "0x0", "name": "main", "is_public": true, "entry": "B0"}],
  "blocks": [
    {"id": "B0", "statements": [
        {"id": "S1", "op": "CALLVALUE", "defs": ["V1"]},
        {"id": "S2", "op": "JUMPI", "operands": ["V9", "V1"]}
     ], "successors": ["B1", "B2"]},
    {"id": "B1", "statements": [{"id": "S3", "op": "REVERT", "operands": ["V8", "V8"]}]},
    {"id": "B2"}
  ]
}"#;

fn write_facts(dir: &std::path::Path) {
    fs::write(dir.join(CFG_FILE), CFG).unwrap();
    fs::write(dir.join("bytecode.hex"), "0x6080604052\n").unwrap();
    fs::write(dir.join(KNOWN_VALUES_FILE), "V8\t0x0\nV9\t0x1f\n").unwrap();
    fs::write(dir.join("TAC_OriginalStatement_Block.csv"), "").unwrap();
    fs::write(dir.join("StorageInitRevertCheck.csv"), "S7\t0x0\tS5\tB1\n").unwrap();
}

#[test]
fn test_parse_constant() {
    assert_eq!(parse_constant("V1", "0x20").unwrap(), U256::from(0x20u64));
    assert_eq!(parse_constant("V1", "ff").unwrap(), U256::from(0xffu64));
    assert!(matches!(
        parse_constant("V1", "0xzz"),
        Err(LoaderError::InvalidConstant { .. })
    ));
}

#[test]
fn test_full_word_constant() {
    let word = format!("0x{}", "f".repeat(64));
    let map = parse_known_values(&format!("V1\t{word}\n"), "kv").unwrap();
    assert_eq!(map["V1"], U256::MAX);
}

#[test]
fn test_blank_lines_and_whitespace() {
    let map = parse_origins("\n  V1 \t B3 \n\n", "origins").unwrap();
    assert_eq!(map["V1"], "B3");
    assert_eq!(map.len(), 1);
}

#[test]
fn test_extra_fields_are_ignored() {
    let (loads, reverts) = parse_storage_revert("S1\t0x0\tS2\tB4\textra\n", "sr").unwrap();
    assert_eq!(loads["S2"], "0x0");
    assert_eq!(reverts, vec!["B4".to_string()]);
}

#[test]
fn test_odd_length_bytecode() {
    assert!(matches!(load_bytecode("0x608"), Err(LoaderError::InvalidHex(_))));
}

#[test]
fn test_long_invalid_hex_is_truncated() {
    let bad = "z".repeat(100);
    match load_bytecode(&bad) {
        Err(LoaderError::InvalidHex(shown)) => assert_eq!(shown.len(), 43),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_invalid_hex_with_multibyte_char() {
    let bad = format!("{}é{}", "a".repeat(39), "b".repeat(10));
    match load_bytecode(&bad) {
        Err(LoaderError::InvalidHex(shown)) => {
            assert_eq!(shown, format!("{}é...", "a".repeat(39)));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_cfg_json() {
    let p = Program::from_json(CFG).unwrap();
    assert_eq!(p.len(), 3);
    let b0 = p.find("B0").unwrap();
    let b1 = p.block_by_id("B1").unwrap();
    assert_eq!(b1.predecessors(), &[b0]);
    assert_eq!(p.block(b0).terminal().and_then(|s| s.branch_condition()), Some("V1"));
    assert_eq!(p.functions()[0].name, "main");
}

#[test]
fn test_load_inputs_from_dir() {
    let dir = tempfile::tempdir().unwrap();
    write_facts(dir.path());
    let inputs = load_inputs(&FactPaths::in_dir(dir.path())).unwrap();
    assert_eq!(inputs.bytecode, vec![0x60, 0x80, 0x60, 0x40, 0x52]);
    assert_eq!(inputs.facts.known_value("V9"), Some(U256::from(0x1fu64)));
    assert_eq!(inputs.facts.storage_slot("S5"), Some("0x0"));
    assert_eq!(inputs.facts.revert_blocks, vec!["B1".to_string()]);
    assert_eq!(inputs.program.len(), 3);
}

#[test]
fn test_missing_fact_file() {
    let dir = tempfile::tempdir().unwrap();
    write_facts(dir.path());
    fs::remove_file(dir.path().join(KNOWN_VALUES_FILE)).unwrap();
    let err = load_inputs(&FactPaths::in_dir(dir.path())).unwrap_err();
    assert!(err.to_string().contains(KNOWN_VALUES_FILE));
}
