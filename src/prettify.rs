//! Human-readable dump of the lifted TAC.
//!
//! Functions are printed in id order; each function's blocks are printed
//! depth-first from its entry block, statements annotated with the constants
//! the upstream analysis knows.

use crate::loader::Facts;
use crate::program::{BlockIdx, Program, Statement};
use crate::utils::helpers::{colors::*, short_var};
use std::collections::HashSet;

const INDENT: &str = "    ";

/// Pretty-print a single statement.
pub fn pprint_statement(stmt: &Statement, facts: &Facts, add_color: bool) -> String {
    let render = |var: &String| match facts.known_value(var) {
        Some(v) => format!("{}(0x{v:x})", short_var(var)),
        None => short_var(var),
    };
    let defs: Vec<String> = stmt.defs.iter().map(render).collect();
    let uses: Vec<String> = stmt.operands.iter().map(render).collect();
    let op = colorize(stmt.op.name(), BLUE, add_color);

    let line = if defs.is_empty() {
        format!("{}: {op} {}", stmt.id, uses.join(", "))
    } else {
        format!("{}: {} = {op} {}", stmt.id, defs.join(", "), uses.join(", "))
    };
    line.trim_end().to_string()
}

/// Pretty-print the whole program.
pub fn pprint_program(program: &Program, facts: &Facts, add_color: bool) -> String {
    let mut out = Vec::new();
    let mut functions: Vec<_> = program.functions().iter().collect();
    functions.sort_by(|a, b| a.id.cmp(&b.id));

    if functions.is_empty() {
        for (idx, _) in program.blocks() {
            pprint_block(program, facts, idx, &mut None, add_color, &mut out);
        }
        return out.join("\n");
    }

    for f in functions {
        let visibility = if f.is_public { "public" } else { "private" };
        out.push(format!(
            "function {}({}) {visibility} {{",
            colorize(&f.name, GREEN, add_color),
            f.formals.join(", ")
        ));
        let mut visited = Some(HashSet::from([f.entry]));
        pprint_block(program, facts, f.entry, &mut visited, add_color, &mut out);
        out.push("}".to_string());
        out.push(String::new());
    }
    out.join("\n")
}

/// Print `idx`, then (when `visited` is tracked) its unvisited successors.
fn pprint_block(
    program: &Program,
    facts: &Facts,
    idx: BlockIdx,
    visited: &mut Option<HashSet<BlockIdx>>,
    add_color: bool,
    out: &mut Vec<String>,
) {
    let block = program.block(idx);
    let ids = |list: &[BlockIdx]| {
        list.iter()
            .map(|b| program.block(*b).id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };

    out.push(format!("{INDENT}Begin block {}", colorize(&block.id, BOLD, add_color)));
    out.push(format!(
        "{INDENT}prev=[{}], succ=[{}]",
        ids(block.predecessors()),
        ids(block.successors())
    ));
    out.push(format!("{INDENT}================================="));
    for stmt in &block.statements {
        out.push(format!("{INDENT}{}", pprint_statement(stmt, facts, add_color)));
    }
    out.push(String::new());

    for succ in block.successors() {
        let fresh = match visited {
            Some(seen) => seen.insert(*succ),
            None => false,
        };
        if fresh {
            pprint_block(program, facts, *succ, visited, add_color, out);
        }
    }
}
