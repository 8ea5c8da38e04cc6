use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use log::debug;
use netforge_netlist::{normalize_circuit, synthesize, Circuit, Synthesis, SynthesisOptions};
use netforge_symbols::SymbolTable;
use serde_json::Value;

use crate::config::{AnalysisArgs, LibraryArgs};
use crate::ui::{self, icons};

#[derive(Args, Debug, Default, Clone)]
#[command(about = "Synthesize SPICE netlists from circuit JSON files")]
pub struct NetlistArgs {
    /// Circuit .json files, or directories holding them (non-recursive).
    /// When omitted, every .json file in the current directory is used.
    #[arg(value_name = "PATHS", value_hint = clap::ValueHint::AnyPath)]
    pub paths: Vec<PathBuf>,

    /// Output file for a single input; `-` writes to stdout.
    /// Defaults to <INPUT>.cir next to each input.
    #[arg(short, long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Read the input as-is, without canonicalizing types and ports
    #[arg(long)]
    pub no_normalize: bool,

    #[command(flatten)]
    pub library: LibraryArgs,

    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

pub fn execute(args: NetlistArgs) -> Result<()> {
    let inputs = collect_files(&args.paths)?;
    if inputs.is_empty() {
        let cwd = std::env::current_dir()?;
        anyhow::bail!("No circuit files found in {}", cwd.display());
    }
    if args.output.is_some() && inputs.len() > 1 {
        anyhow::bail!(
            "--output takes a single input, got {} files",
            inputs.len()
        );
    }

    let mut has_errors = false;
    for input in &inputs {
        let file_name = display_name(input);
        match netlist_file(input, &args) {
            Ok((synthesis, destination)) => {
                let warnings = synthesis.diagnostics.len();
                let summary = format!(
                    "({} device line(s), {} warning(s))",
                    synthesis.netlist.devices().len(),
                    warnings
                );
                match destination {
                    Some(path) => eprintln!(
                        "{} {} -> {} {summary}",
                        icons::success(),
                        file_name.green().bold(),
                        path.display()
                    ),
                    None => eprintln!("{} {} {summary}", icons::success(), file_name.green().bold()),
                }
            }
            Err(err) => {
                eprintln!("{} {}: {err:#}", icons::error(), file_name.red().bold());
                has_errors = true;
            }
        }
    }

    if has_errors {
        anyhow::bail!("Netlist synthesis failed");
    }
    Ok(())
}

/// Synthesize one file and write its deck. Returns the file written, or
/// `None` for stdout.
fn netlist_file(input: &Path, args: &NetlistArgs) -> Result<(Synthesis, Option<PathBuf>)> {
    let config = args.library.load_config(Some(input))?;
    let symbols = args.library.symbols(&config)?;
    let options = args.analysis.apply(args.library.options(&config))?;

    let (source, circuit) = load_circuit(input, &symbols, !args.no_normalize)?;
    let synthesis = synthesize_reported(input, &source, &circuit, &symbols, &options)?;

    let destination = match &args.output {
        Some(path) if path.as_os_str() == "-" => None,
        Some(path) => Some(path.clone()),
        None => Some(input.with_extension("cir")),
    };
    match &destination {
        Some(path) => fs::write(path, synthesis.netlist.to_spice())
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => print!("{}", synthesis.netlist),
    }
    Ok((synthesis, destination))
}

/// Read a circuit file, optionally normalizing it first. Syntax errors are
/// rendered against the source before being returned. Whatever the
/// normalizer drops is carried in the circuit's diagnostics.
pub fn load_circuit(path: &Path, symbols: &SymbolTable, normalize: bool) -> Result<(String, Circuit)> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let value: Value = match serde_json::from_str(&source) {
        Ok(value) => value,
        Err(err) => {
            ui::render_json_error(path, &source, &err);
            return Err(err).context("Malformed circuit JSON");
        }
    };
    let (value, mut diagnostics) = if normalize {
        debug!("Normalizing {}", path.display());
        let normalized = normalize_circuit(&value, symbols)?;
        (normalized.circuit, normalized.diagnostics)
    } else {
        (value, Vec::new())
    };

    let mut circuit = Circuit::from_value(value)?;
    diagnostics.append(&mut circuit.diagnostics);
    circuit.diagnostics = diagnostics;
    Ok((source, circuit))
}

/// Synthesize and render every diagnostic against `source`.
pub fn synthesize_reported(
    path: &Path,
    source: &str,
    circuit: &Circuit,
    symbols: &SymbolTable,
    options: &SynthesisOptions,
) -> Result<Synthesis> {
    let synthesis = synthesize(circuit, symbols, options)?;
    for diag in &synthesis.diagnostics {
        ui::render_diagnostic(path, source, diag);
    }
    Ok(synthesis)
}

/// Collect circuit files from the provided paths, sorted and deduplicated.
pub fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut unique: HashSet<PathBuf> = HashSet::new();

    if paths.is_empty() {
        json_files_in(&std::env::current_dir()?, &mut unique)?;
    }
    for path in paths {
        if path.is_dir() {
            json_files_in(path, &mut unique)?;
        } else if path.is_file() {
            unique.insert(path.clone());
        } else {
            anyhow::bail!("No such file or directory: {}", path.display());
        }
    }

    let mut paths: Vec<_> = unique.into_iter().collect();
    paths.sort();
    Ok(paths)
}

fn json_files_in(dir: &Path, out: &mut HashSet<PathBuf>) -> Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            out.insert(path);
        }
    }
    Ok(())
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
