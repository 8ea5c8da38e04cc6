use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const DEFAULT_TITLE: &str = "NETFORGE_CIRCUIT";
pub const DEFAULT_GRID: f64 = 10.0;

/// Knobs for one synthesis pass.
///
/// Deserializes from a partial table; missing keys take their defaults. An
/// empty `analyses` list means a single default transient run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisOptions {
    pub title: String,
    /// Canvas grid unit. Port positions are snapped to multiples of it.
    pub grid: f64,
    pub analyses: Vec<Analysis>,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            grid: DEFAULT_GRID,
            analyses: Vec::new(),
        }
    }
}

impl SynthesisOptions {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_grid(mut self, grid: f64) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_analysis(mut self, analysis: Analysis) -> Self {
        self.analyses.push(analysis);
        self
    }

    /// The analyses actually written to the control block.
    pub fn effective_analyses(&self) -> Vec<Analysis> {
        if self.analyses.is_empty() {
            vec![Analysis::default_transient()]
        } else {
            self.analyses.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Analysis {
    /// Operating point.
    Op,
    Tran {
        step: String,
        stop: String,
    },
    Ac {
        variation: AcVariation,
        points: u32,
        fstart: String,
        fstop: String,
    },
}

impl Analysis {
    pub fn default_transient() -> Self {
        Analysis::Tran {
            step: "1m".to_string(),
            stop: "1s".to_string(),
        }
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Analysis::Op => write!(f, "op"),
            Analysis::Tran { step, stop } => write!(f, "tran {step} {stop}"),
            Analysis::Ac {
                variation,
                points,
                fstart,
                fstop,
            } => write!(f, "ac {variation} {points} {fstart} {fstop}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcVariation {
    Dec,
    Oct,
    Lin,
}

impl fmt::Display for AcVariation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AcVariation::Dec => "dec",
            AcVariation::Oct => "oct",
            AcVariation::Lin => "lin",
        })
    }
}

impl FromStr for AcVariation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dec" => Ok(AcVariation::Dec),
            "oct" => Ok(AcVariation::Oct),
            "lin" => Ok(AcVariation::Lin),
            other => Err(format!(
                "unknown AC sweep variation '{other}' (expected dec, oct or lin)"
            )),
        }
    }
}
