use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use log::debug;
use netforge_netlist::{AcVariation, Analysis, SynthesisOptions};
use netforge_symbols::SymbolTable;
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "netforge.toml";

/// Contents of a `netforge.toml`. Every key is optional.
///
/// ```toml
/// title = "FILTER"
/// grid = 10
/// symbols = "lib/symbols"
///
/// [[analyses]]
/// type = "ac"
/// variation = "dec"
/// points = 20
/// fstart = "10"
/// fstop = "100k"
/// ```
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub title: Option<String>,
    pub grid: Option<f64>,
    pub analyses: Vec<Analysis>,
    /// Symbol package directory. Relative paths are taken from the file's
    /// directory.
    pub symbols: Option<PathBuf>,
}

impl Config {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Invalid netforge configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if let (Some(symbols), Some(dir)) = (&config.symbols, path.parent()) {
            if symbols.is_relative() {
                config.symbols = Some(dir.join(symbols));
            }
        }
        Ok(config)
    }

    /// `netforge.toml` next to `input`, else in the current directory.
    pub fn discover(input: Option<&Path>) -> Option<PathBuf> {
        let beside_input = input
            .and_then(Path::parent)
            .map(|dir| {
                if dir.as_os_str().is_empty() {
                    Path::new(".")
                } else {
                    dir
                }
            })
            .map(|dir| dir.join(CONFIG_FILE_NAME));

        beside_input
            .into_iter()
            .chain(std::env::current_dir().ok().map(|cwd| cwd.join(CONFIG_FILE_NAME)))
            .find(|candidate| candidate.is_file())
    }

    /// Read the explicit file, or the discovered one, or fall back to defaults.
    pub fn load(explicit: Option<&Path>, input: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => Self::discover(input),
        };
        match path {
            Some(path) => {
                debug!("Using configuration {}", path.display());
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }
}

/// Built-in symbols, with the package at `dir` merged on top.
pub fn load_symbols(dir: Option<&Path>) -> Result<SymbolTable> {
    let builtin = SymbolTable::builtin();
    let Some(dir) = dir else {
        return Ok(builtin);
    };
    let package = SymbolTable::from_dir(dir)
        .with_context(|| format!("Failed to load symbol package {}", dir.display()))?;
    debug!(
        "Loaded {} symbol(s) from {}",
        package.len(),
        dir.display()
    );
    Ok(builtin.merged_with(package))
}

/// Where symbols and settings come from. Shared by every subcommand that
/// reads a circuit.
#[derive(Args, Debug, Default, Clone)]
pub struct LibraryArgs {
    /// Symbol package directory merged over the built-in library
    #[arg(long, value_name = "DIR", value_hint = clap::ValueHint::DirPath)]
    pub symbols: Option<PathBuf>,

    /// Configuration file (default: netforge.toml next to the input or in the current directory)
    #[arg(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Canvas grid unit used to match port positions
    #[arg(long, value_name = "UNIT")]
    pub grid: Option<f64>,
}

impl LibraryArgs {
    pub fn load_config(&self, input: Option<&Path>) -> Result<Config> {
        Config::load(self.config.as_deref(), input)
    }

    /// Symbol table for `config`; `--symbols` beats the file's `symbols` key.
    pub fn symbols(&self, config: &Config) -> Result<SymbolTable> {
        load_symbols(self.symbols.as_deref().or(config.symbols.as_deref()))
    }

    /// Options from `config` with the grid flag applied.
    pub fn options(&self, config: &Config) -> SynthesisOptions {
        let mut options = SynthesisOptions::default();
        if let Some(title) = &config.title {
            options.title = title.clone();
        }
        if let Some(grid) = self.grid.or(config.grid) {
            options.grid = grid;
        }
        options.analyses = config.analyses.clone();
        options
    }
}

/// Analysis and title flags for `netforge netlist`.
#[derive(Args, Debug, Default, Clone)]
pub struct AnalysisArgs {
    /// Netlist title
    #[arg(long)]
    pub title: Option<String>,

    /// Add an operating-point analysis
    #[arg(long)]
    pub op: bool,

    /// Add a transient analysis
    #[arg(long, num_args = 2, value_names = ["STEP", "STOP"])]
    pub tran: Option<Vec<String>>,

    /// Add an AC sweep, e.g. `--ac dec 10 1 1meg`
    #[arg(long, num_args = 4, value_names = ["VARIATION", "POINTS", "FSTART", "FSTOP"])]
    pub ac: Option<Vec<String>>,
}

impl AnalysisArgs {
    /// Analyses named on the command line, in flag order op, tran, ac.
    pub fn analyses(&self) -> Result<Vec<Analysis>> {
        let mut analyses = Vec::new();
        if self.op {
            analyses.push(Analysis::Op);
        }
        if let Some([step, stop]) = self.tran.as_deref() {
            analyses.push(Analysis::Tran {
                step: step.clone(),
                stop: stop.clone(),
            });
        }
        if let Some([variation, points, fstart, fstop]) = self.ac.as_deref() {
            let variation: AcVariation = variation.parse().map_err(anyhow::Error::msg)?;
            let points: u32 = points
                .parse()
                .with_context(|| format!("Invalid AC point count '{points}'"))?;
            analyses.push(Analysis::Ac {
                variation,
                points,
                fstart: fstart.clone(),
                fstop: fstop.clone(),
            });
        }
        Ok(analyses)
    }

    /// Apply the flags over `options`. Analyses given here replace the file's.
    pub fn apply(&self, mut options: SynthesisOptions) -> Result<SynthesisOptions> {
        if let Some(title) = &self.title {
            options.title = title.clone();
        }
        let analyses = self.analyses()?;
        if !analyses.is_empty() {
            options.analyses = analyses;
        }
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_config() {
        let config = Config::from_toml_str(
            r#"
            title = "FILTER"

            [[analyses]]
            type = "op"

            [[analyses]]
            type = "ac"
            variation = "dec"
            points = 20
            fstart = "10"
            fstop = "100k"
            "#,
        )
        .unwrap();

        assert_eq!(config.title.as_deref(), Some("FILTER"));
        assert_eq!(config.grid, None);
        assert_eq!(config.analyses.len(), 2);
        assert_eq!(config.analyses[1].to_string(), "ac dec 20 10 100k");
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(Config::from_toml_str("titel = \"typo\"").is_err());
    }

    #[test]
    fn flags_override_file() {
        let config = Config {
            title: Some("FILE".into()),
            grid: Some(20.0),
            analyses: vec![Analysis::Op],
            symbols: None,
        };
        let library = LibraryArgs {
            grid: Some(5.0),
            ..Default::default()
        };
        let flags = AnalysisArgs {
            title: Some("FLAG".into()),
            tran: Some(vec!["1u".into(), "1m".into()]),
            ..Default::default()
        };

        let options = flags.apply(library.options(&config)).unwrap();
        assert_eq!(options.title, "FLAG");
        assert_eq!(options.grid, 5.0);
        assert_eq!(
            options.analyses,
            vec![Analysis::Tran {
                step: "1u".into(),
                stop: "1m".into()
            }]
        );
    }

    #[test]
    fn file_analyses_survive_without_flags() {
        let config = Config {
            analyses: vec![Analysis::Op],
            ..Default::default()
        };
        let options = AnalysisArgs::default()
            .apply(LibraryArgs::default().options(&config))
            .unwrap();
        assert_eq!(options.analyses, vec![Analysis::Op]);
        assert_eq!(options.grid, 10.0);
    }

    #[test]
    fn bad_ac_flags_are_errors() {
        let flags = AnalysisArgs {
            ac: Some(vec!["log".into(), "10".into(), "1".into(), "1k".into()]),
            ..Default::default()
        };
        assert!(flags.analyses().is_err());

        let flags = AnalysisArgs {
            ac: Some(vec!["dec".into(), "ten".into(), "1".into(), "1k".into()]),
            ..Default::default()
        };
        assert!(flags.analyses().is_err());
    }
}
