//! Symbol definitions for schematic capture.
//!
//! A [`SymbolDefinition`] describes the fixed geometry of one device type: the
//! size of its drawing box and the named ports at fixed offsets inside that
//! box. Definitions are collected into an immutable [`SymbolTable`] keyed by
//! the lowercase device type (`resistor`, `vsource`, `npn`, …) which is handed
//! to the netlist synthesizer as a plain value.
//!
//! ```rust
//! use netforge_symbols::{SymbolDefinition, SymbolTable};
//!
//! let table = SymbolTable::builtin().with_symbol(
//!     "crystal",
//!     SymbolDefinition::new("crystal", 60.0, 20.0)
//!         .with_port("1", 0.0, 10.0)
//!         .with_port("2", 60.0, 10.0),
//! );
//! assert_eq!(table.get("crystal").unwrap().ports.len(), 2);
//! ```

mod builtin;
mod package;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// A named connection point on a symbol, relative to the symbol's top-left
/// corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub x: f64,
    pub y: f64,
}

impl Port {
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolDefinition {
    #[serde(default)]
    pub name: String,
    #[serde(alias = "w")]
    pub width: f64,
    #[serde(alias = "h")]
    pub height: f64,
    #[serde(default)]
    pub ports: Vec<Port>,
    /// Preferred reference-designator prefix (`R`, `Q`, …), informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl SymbolDefinition {
    pub fn new(name: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            ports: Vec::new(),
            prefix: None,
        }
    }

    /// Builder-style port insertion that consumes `self`.
    pub fn with_port(mut self, id: impl Into<String>, x: f64, y: f64) -> Self {
        self.ports.push(Port::new(id, x, y));
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn port(&self, id: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == id)
    }

    pub fn has_port(&self, id: &str) -> bool {
        self.port(id).is_some()
    }

    /// Port ids in definition order.
    pub fn port_ids(&self) -> Vec<&str> {
        self.ports.iter().map(|p| p.id.as_str()).collect()
    }
}

/// Immutable lookup `device type -> symbol definition`.
///
/// Keys are stored lowercase; lookups are case-insensitive. Iteration order is
/// the sorted order of type names so anything derived from the table is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SymbolTable {
    symbols: BTreeMap<String, SymbolDefinition>,
}

impl SymbolTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The library of symbols every editor session starts with.
    pub fn builtin() -> Self {
        builtin::builtin_symbols()
            .into_iter()
            .fold(Self::new(), |table, (type_name, def)| {
                table.with_symbol(type_name, def)
            })
    }

    /// Builder-style insertion that consumes `self`. An existing definition for
    /// the same type is replaced.
    pub fn with_symbol(mut self, type_name: impl AsRef<str>, def: SymbolDefinition) -> Self {
        self.symbols.insert(type_name.as_ref().to_ascii_lowercase(), def);
        self
    }

    /// Overlay `other` on top of `self`; definitions in `other` win.
    pub fn merged_with(mut self, other: SymbolTable) -> Self {
        self.symbols.extend(other.symbols);
        self
    }

    pub fn get(&self, type_name: &str) -> Option<&SymbolDefinition> {
        if let Some(def) = self.symbols.get(type_name) {
            return Some(def);
        }
        self.symbols.get(&type_name.to_ascii_lowercase())
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.get(type_name).is_some()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SymbolDefinition)> {
        self.symbols.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// `type -> [port ids]`, the vocabulary a circuit generator may use.
    pub fn catalog(&self) -> BTreeMap<String, Vec<String>> {
        self.symbols
            .iter()
            .map(|(type_name, def)| {
                let ports = def.ports.iter().map(|p| p.id.clone()).collect();
                (type_name.clone(), ports)
            })
            .collect()
    }

    /// Parse symbol definitions from JSON.
    ///
    /// Three shapes are accepted: a single definition object, an array of
    /// definitions, or an object mapping type names to definitions. Definitions
    /// without a map key are registered under their `name`.
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(contents).context("Invalid symbol JSON")?;
        let single = matches!(&value, serde_json::Value::Object(map) if map.contains_key("ports"));
        let mut table = Self::new();

        match value {
            serde_json::Value::Object(_) if single => {
                let def: SymbolDefinition = serde_json::from_value(value)?;
                table = table.with_named(def)?;
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    let def: SymbolDefinition = serde_json::from_value(item)?;
                    table = table.with_named(def)?;
                }
            }
            serde_json::Value::Object(map) => {
                for (type_name, item) in map {
                    let mut def: SymbolDefinition = serde_json::from_value(item)
                        .with_context(|| format!("Invalid symbol definition '{type_name}'"))?;
                    if def.name.is_empty() {
                        def.name = type_name.clone();
                    }
                    table = table.with_symbol(type_name, def);
                }
            }
            _ => anyhow::bail!("Symbol JSON must be an object or an array"),
        }

        Ok(table)
    }

    /// Parse a single JSON file (any shape accepted by [`Self::from_json_str`]).
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Load a symbol package directory: every file listed in its `index.json`
    /// (or every `*.json` file when there is no index), later files winning.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        package::load_package(dir)
    }

    fn with_named(self, def: SymbolDefinition) -> Result<Self> {
        if def.name.is_empty() {
            anyhow::bail!("Symbol definition without a name");
        }
        let type_name = def.name.clone();
        Ok(self.with_symbol(type_name, def))
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        String(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::String(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
