//! Revertscope CLI: revert-constraint reconstruction from a lifted TAC.

use anyhow::{Context, Result};
use clap::Parser;
use revertscope::driver::{analyze, render, AnalysisConfig, OutputFormat};
use revertscope::errors::DEFAULT_MAX_DEPTH;
use revertscope::loader::{load_inputs, FactPaths};
use revertscope::prettify::pprint_program;
use revertscope::report::{dedupe, parse_report, ReportEntry};
use std::io::IsTerminal;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "revertscope",
    version,
    about = "Reconstruct revert conditions and messages from a decompiled EVM TAC"
)]
struct Cli {
    /// Directory holding the fact files and the CFG.
    #[arg(value_name = "FACTS_DIR", default_value = ".")]
    facts_dir: PathBuf,

    /// CFG file (default: FACTS_DIR/cfg.json).
    #[arg(long)]
    cfg: Option<PathBuf>,

    /// Runtime bytecode hex file (default: FACTS_DIR/bytecode.hex).
    #[arg(long)]
    bytecode: Option<PathBuf>,

    /// Constant-value facts (default: FACTS_DIR/TAC_Variable_Value.csv).
    #[arg(long)]
    known_values: Option<PathBuf>,

    /// Origin index (default: FACTS_DIR/TAC_OriginalStatement_Block.csv).
    #[arg(long)]
    origins: Option<PathBuf>,

    /// Storage-load and revert-block facts (default: FACTS_DIR/StorageInitRevertCheck.csv).
    #[arg(long)]
    storage_revert: Option<PathBuf>,

    /// Write the report to a file instead of stdout.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Output format: text (default), json.
    #[arg(short = 'f', long, default_value = "text")]
    format: String,

    /// Maximum recursion depth per resolution.
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Print the loaded TAC instead of analysing it.
    #[arg(long)]
    dump_tac: bool,

    /// Read a written text report and print its distinct entries as JSON.
    #[arg(long, value_name = "FILE")]
    read_report: Option<PathBuf>,

    /// With --read-report: keep only entries an equivalence check can use.
    #[arg(long, requires = "read_report")]
    checkable: bool,

    /// Disable coloured output.
    #[arg(long)]
    no_color: bool,

    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn fact_paths(&self) -> FactPaths {
        let mut paths = FactPaths::in_dir(&self.facts_dir);
        let overrides = [
            (&mut paths.cfg, &self.cfg),
            (&mut paths.bytecode, &self.bytecode),
            (&mut paths.known_values, &self.known_values),
            (&mut paths.origins, &self.origins),
            (&mut paths.storage_revert, &self.storage_revert),
        ];
        for (slot, given) in overrides {
            if let Some(p) = given {
                *slot = p.clone();
            }
        }
        paths
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let color = !cli.no_color && cli.output.is_none() && std::io::stdout().is_terminal();

    let text = if let Some(ref path) = cli.read_report {
        let report = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report {}", path.display()))?;
        let mut entries = dedupe(parse_report(&report));
        if cli.checkable {
            entries.retain(ReportEntry::is_checkable);
        }
        serde_json::to_string_pretty(&entries).context("serialise report entries")?
    } else {
        let inputs = load_inputs(&cli.fact_paths())?;
        if cli.dump_tac {
            pprint_program(&inputs.program, &inputs.facts, color)
        } else {
            let format = match cli.format.as_str() {
                "json" => OutputFormat::Json,
                _ => OutputFormat::Text,
            };
            let config = AnalysisConfig {
                max_depth: cli.max_depth,
                format,
                color,
            };
            render(&analyze(&inputs, &config), &config)?
        }
    };

    match cli.output {
        Some(ref path) => std::fs::write(path, &text)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", text.trim_end()),
    }
    Ok(())
}
