//! The program model: statements, blocks and functions of a lifted CFG.
//!
//! Blocks live in an arena and refer to each other by [`BlockIdx`]. The graph
//! is built once (from the external CFG export or a [`ProgramBuilder`]) and is
//! read-only afterwards. Predecessor and successor lists are derived from the
//! same edge list, so `a ∈ pred(b) ⇔ b ∈ succ(a)` always holds.

use crate::errors::LoaderError;
use crate::utils::opcodes::Opcode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Index of a block in its [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockIdx(usize);

/// A single TAC statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub id: String,
    pub op: Opcode,
    /// Zero or one defined variable.
    pub defs: Vec<String>,
    pub operands: Vec<String>,
}

impl Statement {
    pub fn new(id: &str, op: Opcode, defs: &[&str], operands: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            op,
            defs: defs.iter().map(|d| d.to_string()).collect(),
            operands: operands.iter().map(|o| o.to_string()).collect(),
        }
    }

    /// The variable this statement defines, if any.
    pub fn def(&self) -> Option<&str> {
        self.defs.first().map(String::as_str)
    }

    pub fn defines(&self, var: &str) -> bool {
        self.def() == Some(var)
    }

    /// Condition operand of a `JUMPI` (operands are `[target, condition]`).
    pub fn branch_condition(&self) -> Option<&str> {
        if self.op.is_conditional_branch() {
            self.operands.get(1).map(String::as_str)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: String,
    pub statements: Vec<Statement>,
    preds: Vec<BlockIdx>,
    succs: Vec<BlockIdx>,
}

impl Block {
    pub fn predecessors(&self) -> &[BlockIdx] {
        &self.preds
    }

    pub fn successors(&self) -> &[BlockIdx] {
        &self.succs
    }

    /// Last statement of the block.
    pub fn terminal(&self) -> Option<&Statement> {
        self.statements.last()
    }
}

#[derive(Debug, Clone)]
pub struct Function {
    pub id: String,
    pub name: String,
    pub is_public: bool,
    pub formals: Vec<String>,
    pub entry: BlockIdx,
}

/// An immutable CFG.
#[derive(Debug, Clone, Default)]
pub struct Program {
    blocks: Vec<Block>,
    index: HashMap<String, BlockIdx>,
    functions: Vec<Function>,
}

impl Program {
    pub fn block(&self, idx: BlockIdx) -> &Block {
        &self.blocks[idx.0]
    }

    /// Look up a block by its id.
    pub fn find(&self, id: &str) -> Option<BlockIdx> {
        self.index.get(id).copied()
    }

    pub fn block_by_id(&self, id: &str) -> Option<&Block> {
        self.find(id).map(|idx| self.block(idx))
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockIdx, &Block)> {
        self.blocks.iter().enumerate().map(|(i, b)| (BlockIdx(i), b))
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Parse the JSON CFG export.
    pub fn from_json(text: &str) -> Result<Program, LoaderError> {
        let file: CfgFile =
            serde_json::from_str(text).map_err(|e| LoaderError::MalformedCfg(e.to_string()))?;
        file.into_program()
    }
}

// ---------------------------------------------------------------------------
// CFG export format
// ---------------------------------------------------------------------------

/// Top-level shape of `cfg.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CfgFile {
    #[serde(default)]
    pub functions: Vec<FunctionRecord>,
    pub blocks: Vec<BlockRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRecord {
    pub id: String,
    #[serde(default)]
    pub statements: Vec<StatementRecord>,
    #[serde(default)]
    pub successors: Vec<String>,
    /// Optional explicit predecessor order; must mirror the successor lists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predecessors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementRecord {
    pub id: String,
    pub op: String,
    #[serde(default)]
    pub defs: Vec<String>,
    #[serde(default)]
    pub operands: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub formals: Vec<String>,
    pub entry: String,
}

impl CfgFile {
    pub fn into_program(self) -> Result<Program, LoaderError> {
        let mut builder = ProgramBuilder::new();
        for b in self.blocks {
            let mut stmts = Vec::with_capacity(b.statements.len());
            for s in b.statements {
                stmts.push(Statement {
                    op: s.op.parse()?,
                    id: s.id,
                    defs: s.defs,
                    operands: s.operands,
                });
            }
            builder = builder.block(&b.id, stmts);
            for succ in &b.successors {
                builder = builder.edge(&b.id, succ);
            }
            if let Some(preds) = b.predecessors {
                builder = builder.predecessor_order(&b.id, preds);
            }
        }
        for f in self.functions {
            builder = builder.function(&f.id, &f.name, f.is_public, f.formals, &f.entry);
        }
        builder.build()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Incremental construction of a [`Program`], validated by [`build`](Self::build).
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    blocks: Vec<(String, Vec<Statement>)>,
    edges: Vec<(String, String)>,
    pred_orders: Vec<(String, Vec<String>)>,
    functions: Vec<FunctionRecord>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(mut self, id: &str, statements: Vec<Statement>) -> Self {
        self.blocks.push((id.to_string(), statements));
        self
    }

    /// Add a control-flow edge. Predecessor lists follow edge insertion order.
    pub fn edge(mut self, from: &str, to: &str) -> Self {
        self.edges.push((from.to_string(), to.to_string()));
        self
    }

    /// Fix the order of `block`'s predecessors; the set must match the edges.
    pub fn predecessor_order(mut self, block: &str, preds: Vec<String>) -> Self {
        self.pred_orders.push((block.to_string(), preds));
        self
    }

    pub fn function(
        mut self,
        id: &str,
        name: &str,
        is_public: bool,
        formals: Vec<String>,
        entry: &str,
    ) -> Self {
        self.functions.push(FunctionRecord {
            id: id.to_string(),
            name: name.to_string(),
            is_public,
            formals,
            entry: entry.to_string(),
        });
        self
    }

    pub fn build(self) -> Result<Program, LoaderError> {
        let mut program = Program::default();

        for (id, statements) in self.blocks {
            validate_statements(&id, &statements)?;
            if program.index.contains_key(&id) {
                return Err(LoaderError::DuplicateBlock(id));
            }
            program.index.insert(id.clone(), BlockIdx(program.blocks.len()));
            program.blocks.push(Block {
                id,
                statements,
                preds: Vec::new(),
                succs: Vec::new(),
            });
        }

        let lookup = |program: &Program, from: &str, target: &str| {
            program.find(target).ok_or_else(|| LoaderError::UnknownBlockRef {
                block: from.to_string(),
                target: target.to_string(),
            })
        };

        for (from, to) in &self.edges {
            let a = lookup(&program, from, from)?;
            let b = lookup(&program, from, to)?;
            if !program.blocks[a.0].succs.contains(&b) {
                program.blocks[a.0].succs.push(b);
                program.blocks[b.0].preds.push(a);
            }
        }

        for (block, order) in self.pred_orders {
            let b = lookup(&program, &block, &block)?;
            let mut declared = Vec::with_capacity(order.len());
            for p in &order {
                let p_idx = lookup(&program, &block, p)?;
                if !program.blocks[b.0].preds.contains(&p_idx) {
                    return Err(LoaderError::InconsistentEdge {
                        from: p.clone(),
                        to: block.clone(),
                    });
                }
                if !declared.contains(&p_idx) {
                    declared.push(p_idx);
                }
            }
            if let Some(missing) = program.blocks[b.0]
                .preds
                .iter()
                .find(|p| !declared.contains(p))
            {
                return Err(LoaderError::InconsistentEdge {
                    from: program.blocks[missing.0].id.clone(),
                    to: block.clone(),
                });
            }
            program.blocks[b.0].preds = declared;
        }

        for f in self.functions {
            let entry = lookup(&program, &f.id, &f.entry)?;
            program.functions.push(Function {
                id: f.id,
                name: f.name,
                is_public: f.is_public,
                formals: f.formals,
                entry,
            });
        }

        log::debug!(
            "built CFG: {} blocks, {} functions",
            program.blocks.len(),
            program.functions.len()
        );
        Ok(program)
    }
}

fn validate_statements(block: &str, statements: &[Statement]) -> Result<(), LoaderError> {
    let last = statements.len().saturating_sub(1);
    for (i, stmt) in statements.iter().enumerate() {
        if stmt.defs.len() > 1 {
            return Err(LoaderError::MultipleDefinitions(stmt.id.clone()));
        }
        if stmt.op.is_control_transfer() && i != last {
            return Err(LoaderError::MisplacedControlTransfer {
                block: block.to_string(),
                stmt: stmt.id.clone(),
            });
        }
    }
    Ok(())
}
