use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use netforge_netlist::synthesize;
use serde_json::json;

use crate::config::LibraryArgs;
use crate::netlist::{display_name, load_circuit, synthesize_reported};
use crate::ui::icons;

#[derive(Args, Debug, Default, Clone)]
#[command(about = "Resolve a circuit's connectivity and list its nodes")]
pub struct CheckArgs {
    /// Circuit .json file
    #[arg(value_name = "INPUT", value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Print the terminal map and diagnostics as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Read the input as-is, without canonicalizing types and ports
    #[arg(long)]
    pub no_normalize: bool,

    #[command(flatten)]
    pub library: LibraryArgs,
}

pub fn execute(args: CheckArgs) -> Result<()> {
    let config = args.library.load_config(Some(&args.input))?;
    let symbols = args.library.symbols(&config)?;
    let options = args.library.options(&config);
    let (source, circuit) = load_circuit(&args.input, &symbols, !args.no_normalize)?;

    if args.json {
        let synthesis = synthesize(&circuit, &symbols, &options)?;
        let nodes: Vec<_> = synthesis
            .terminal_nodes
            .iter()
            .map(|(terminal, node)| json!({ "terminal": terminal, "node": node }))
            .collect();
        let report = json!({
            "nodes": nodes,
            "diagnostics": synthesis.diagnostics,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let synthesis = synthesize_reported(&args.input, &source, &circuit, &symbols, &options)?;
    let width = synthesis
        .terminal_nodes
        .iter()
        .map(|(terminal, _)| terminal.len())
        .max()
        .unwrap_or(0);
    for (terminal, node) in &synthesis.terminal_nodes {
        println!("{terminal:<width$}  {node}");
    }

    let file_name = display_name(&args.input);
    if synthesis.diagnostics.is_empty() {
        eprintln!("{} {}", icons::success(), file_name.green().bold());
    } else {
        eprintln!(
            "{} {} ({} warning(s))",
            icons::warning(),
            file_name.yellow().bold(),
            synthesis.diagnostics.len()
        );
    }
    Ok(())
}
