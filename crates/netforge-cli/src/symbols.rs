use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::config::load_symbols;

#[derive(Args, Debug, Default, Clone)]
#[command(about = "Print every symbol type with its port ids as JSON")]
pub struct SymbolsArgs {
    /// Symbol package directory merged over the built-in library
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub symbols: Option<PathBuf>,
}

pub fn execute(args: SymbolsArgs) -> Result<()> {
    let table = load_symbols(args.symbols.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&table.catalog())?);
    Ok(())
}
