use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::SymbolTable;

const INDEX_FILE: &str = "index.json";

/// Load every symbol file of a package directory into one table.
///
/// When the directory carries an `index.json` (a JSON array of file names
/// relative to the directory) exactly those files are loaded in listed order.
/// Otherwise every `*.json` file is loaded in file-name order. A file holding a
/// single unnamed definition is registered under its file stem.
pub(crate) fn load_package(dir: &Path) -> Result<SymbolTable> {
    if !dir.is_dir() {
        anyhow::bail!("Symbol package {} is not a directory", dir.display());
    }

    let files = package_files(dir)?;
    log::debug!(
        "Loading {} symbol file(s) from {}",
        files.len(),
        dir.display()
    );

    let mut table = SymbolTable::new();
    for path in files {
        table = table.merged_with(load_symbol_file(&path)?);
    }
    Ok(table)
}

fn package_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let index = dir.join(INDEX_FILE);
    if index.is_file() {
        let contents = std::fs::read_to_string(&index)
            .with_context(|| format!("Failed to read {}", index.display()))?;
        let names: Vec<String> = serde_json::from_str(&contents)
            .with_context(|| format!("{} must be a JSON array of file names", index.display()))?;
        return Ok(names.into_iter().map(|name| dir.join(name)).collect());
    }

    let mut files = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn load_symbol_file(path: &Path) -> Result<SymbolTable> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut value: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    // Single-definition files may omit `name`; the file stem stands in.
    if let serde_json::Value::Object(map) = &mut value {
        let unnamed = map.contains_key("ports")
            && !map
                .get("name")
                .and_then(|n| n.as_str())
                .is_some_and(|n| !n.is_empty());
        if unnamed {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            log::debug!("Symbol in {} has no name, using '{stem}'", path.display());
            map.insert("name".to_string(), serde_json::Value::String(stem));
        }
    }

    SymbolTable::from_json_str(&value.to_string())
        .with_context(|| format!("Invalid symbol file {}", path.display()))
}
