use clap::{Parser, Subcommand};

mod check;
mod config;
mod netlist;
mod normalize;
mod symbols;
mod ui;

#[derive(Parser)]
#[command(name = "netforge")]
#[command(about = "Turn placed schematics into SPICE netlists", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize a SPICE netlist for each circuit file
    #[command(alias = "n")]
    Netlist(netlist::NetlistArgs),

    /// Show how terminals resolve to nodes, with diagnostics
    #[command(alias = "c")]
    Check(check::CheckArgs),

    /// Print the canonical form of a generated circuit
    Normalize(normalize::NormalizeArgs),

    /// Print the port catalog of the symbol library
    Symbols(symbols::SymbolsArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Netlist(args) => netlist::execute(args),
        Commands::Check(args) => check::execute(args),
        Commands::Normalize(args) => normalize::execute(args),
        Commands::Symbols(args) => symbols::execute(args),
    }
}
