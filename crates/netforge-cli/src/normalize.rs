use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use netforge_netlist::normalize_circuit;
use serde_json::Value;

use crate::config::{load_symbols, Config};
use crate::ui;

#[derive(Args, Debug, Default, Clone)]
#[command(about = "Canonicalize a generated circuit and print it as JSON")]
pub struct NormalizeArgs {
    /// Circuit .json file
    #[arg(value_name = "INPUT", value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Symbol package directory merged over the built-in library
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub symbols: Option<PathBuf>,

    /// Configuration file (default: netforge.toml next to the input or in the current directory)
    #[arg(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,
}

pub fn execute(args: NormalizeArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref(), Some(&args.input))?;
    let symbols = load_symbols(args.symbols.as_deref().or(config.symbols.as_deref()))?;

    let source = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let value: Value = match serde_json::from_str(&source) {
        Ok(value) => value,
        Err(err) => {
            ui::render_json_error(&args.input, &source, &err);
            return Err(err).context("Malformed circuit JSON");
        }
    };

    let normalized = normalize_circuit(&value, &symbols)?;
    for diag in &normalized.diagnostics {
        ui::render_diagnostic(&args.input, &source, diag);
    }
    println!("{}", serde_json::to_string_pretty(&normalized.circuit)?);
    Ok(())
}
