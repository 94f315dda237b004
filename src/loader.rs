//! Input loading: bytecode image, fact files and the CFG export.
//!
//! Fact files are headerless, tab- or comma-delimited records written by the
//! decompilation pipeline. The delimiter is picked from the first non-empty
//! line of each file.

use crate::errors::LoaderError;
use crate::program::Program;
use anyhow::{Context, Result};
use primitive_types::U256;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const BYTECODE_FILE: &str = "bytecode.hex";
pub const KNOWN_VALUES_FILE: &str = "TAC_Variable_Value.csv";
pub const ORIGINS_FILE: &str = "TAC_OriginalStatement_Block.csv";
pub const STORAGE_REVERT_FILE: &str = "StorageInitRevertCheck.csv";
pub const CFG_FILE: &str = "cfg.json";

/// Location of every input of one analysis run.
#[derive(Debug, Clone)]
pub struct FactPaths {
    pub bytecode: PathBuf,
    pub known_values: PathBuf,
    pub origins: PathBuf,
    pub storage_revert: PathBuf,
    pub cfg: PathBuf,
}

impl FactPaths {
    /// The standard file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            bytecode: dir.join(BYTECODE_FILE),
            known_values: dir.join(KNOWN_VALUES_FILE),
            origins: dir.join(ORIGINS_FILE),
            storage_revert: dir.join(STORAGE_REVERT_FILE),
            cfg: dir.join(CFG_FILE),
        }
    }
}

/// The read-only lookup tables produced by the upstream analyses.
#[derive(Debug, Clone, Default)]
pub struct Facts {
    /// Variable → constant, from constant propagation.
    pub known_values: HashMap<String, U256>,
    /// Load statement → storage slot descriptor.
    pub storage_loads: HashMap<String, String>,
    /// Variable or statement → originating block id.
    pub origins: HashMap<String, String>,
    /// Revert blocks to analyse, deduplicated, in first-seen order.
    pub revert_blocks: Vec<String>,
}

impl Facts {
    pub fn with_known(mut self, var: &str, value: U256) -> Self {
        self.known_values.insert(var.to_string(), value);
        self
    }

    pub fn with_storage(mut self, load_stmt: &str, slot: &str) -> Self {
        self.storage_loads.insert(load_stmt.to_string(), slot.to_string());
        self
    }

    pub fn with_origin(mut self, var: &str, block: &str) -> Self {
        self.origins.insert(var.to_string(), block.to_string());
        self
    }

    pub fn with_revert_block(mut self, block: &str) -> Self {
        if !self.revert_blocks.iter().any(|b| b == block) {
            self.revert_blocks.push(block.to_string());
        }
        self
    }

    pub fn known_value(&self, var: &str) -> Option<U256> {
        self.known_values.get(var).copied()
    }

    pub fn storage_slot(&self, var: &str) -> Option<&str> {
        self.storage_loads.get(var).map(String::as_str)
    }

    pub fn origin(&self, var: &str) -> Option<&str> {
        self.origins.get(var).map(String::as_str)
    }
}

/// Everything the driver needs, loaded once.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub program: Program,
    pub facts: Facts,
    pub bytecode: Vec<u8>,
}

/// Load all inputs named by `paths`.
pub fn load_inputs(paths: &FactPaths) -> Result<Inputs> {
    let bytecode = load_bytecode(&read(&paths.bytecode)?)
        .with_context(|| format!("failed to load bytecode from {}", paths.bytecode.display()))?;

    let cfg_text = read(&paths.cfg)?;
    let program = Program::from_json(&cfg_text)
        .with_context(|| format!("failed to load CFG from {}", paths.cfg.display()))?;

    let mut facts = Facts {
        known_values: parse_known_values(&read(&paths.known_values)?, &file_name(&paths.known_values))?,
        origins: parse_origins(&read(&paths.origins)?, &file_name(&paths.origins))?,
        ..Facts::default()
    };
    let (storage_loads, revert_blocks) =
        parse_storage_revert(&read(&paths.storage_revert)?, &file_name(&paths.storage_revert))?;
    facts.storage_loads = storage_loads;
    facts.revert_blocks = revert_blocks;

    log::info!(
        "loaded {} blocks, {} known values, {} storage loads, {} revert blocks",
        program.len(),
        facts.known_values.len(),
        facts.storage_loads.len(),
        facts.revert_blocks.len()
    );
    Ok(Inputs {
        program,
        facts,
        bytecode,
    })
}

fn read(path: &Path) -> Result<String, LoaderError> {
    std::fs::read_to_string(path).map_err(|source| LoaderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Decode a hex bytecode image (with or without `0x` prefix).
pub fn load_bytecode(source: &str) -> Result<Vec<u8>, LoaderError> {
    let trimmed = source.trim();
    let hex_str = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    hex::decode(hex_str).map_err(|_| {
        LoaderError::InvalidHex(if hex_str.chars().count() > 40 {
            format!("{}...", hex_str.chars().take(40).collect::<String>())
        } else {
            hex_str.to_string()
        })
    })
}

/// Parse a hex constant as written by the constant-propagation pass.
pub fn parse_constant(var: &str, value: &str) -> Result<U256, LoaderError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    U256::from_str_radix(digits, 16).map_err(|_| LoaderError::InvalidConstant {
        var: var.to_string(),
        value: value.to_string(),
    })
}

/// `(variable, value)` records; the last record for a variable wins.
pub fn parse_known_values(text: &str, file: &str) -> Result<HashMap<String, U256>, LoaderError> {
    let mut map = HashMap::new();
    for (line, fields) in records(text, file, 2)? {
        let value = parse_constant(&fields[0], &fields[1]).map_err(|e| LoaderError::MalformedRecord {
            file: file.to_string(),
            reason: format!("line {line}: {e}"),
        })?;
        map.insert(fields[0].clone(), value);
    }
    Ok(map)
}

/// `(variable, block)` records; the last record for a variable wins.
pub fn parse_origins(text: &str, file: &str) -> Result<HashMap<String, String>, LoaderError> {
    let mut map = HashMap::new();
    for (_, fields) in records(text, file, 2)? {
        let mut fields = fields.into_iter();
        if let (Some(var), Some(block)) = (fields.next(), fields.next()) {
            map.insert(var, block);
        }
    }
    Ok(map)
}

/// `(revertStatement, storageLoc, loadStatement, revertBlock)` records.
///
/// Returns the storage-load map (first record per load statement wins) and
/// the revert blocks (deduplicated, first-seen order).
pub fn parse_storage_revert(
    text: &str,
    file: &str,
) -> Result<(HashMap<String, String>, Vec<String>), LoaderError> {
    let mut loads = HashMap::new();
    let mut reverts: Vec<String> = Vec::new();
    for (_, fields) in records(text, file, 4)? {
        loads
            .entry(fields[2].clone())
            .or_insert_with(|| fields[1].clone());
        if !reverts.contains(&fields[3]) {
            reverts.push(fields[3].clone());
        }
    }
    Ok((loads, reverts))
}

/// Split `text` into records of at least `min_fields` trimmed fields, paired
/// with their 1-based line numbers. Blank lines are skipped.
fn records(text: &str, file: &str, min_fields: usize) -> Result<Vec<(usize, Vec<String>)>, LoaderError> {
    let delimiter = match text.lines().find(|l| !l.trim().is_empty()) {
        Some(first) if !first.contains('\t') && first.contains(',') => b',',
        _ => b'\t',
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut out = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| LoaderError::MalformedRecord {
            file: file.to_string(),
            reason: e.to_string(),
        })?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);
        if record.len() < min_fields {
            return Err(LoaderError::ShortRow {
                file: file.to_string(),
                line,
                expected: min_fields,
                found: record.len(),
            });
        }
        out.push((line, record.iter().map(str::to_string).collect()));
    }
    Ok(out)
}
