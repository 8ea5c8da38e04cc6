// SPICE deck assembly.

use std::fmt;

use serde::Serialize;

use crate::options::Analysis;

/// A finished netlist, kept as its ordered sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Netlist {
    header: Vec<String>,
    models: Vec<String>,
    devices: Vec<String>,
    extras: Vec<String>,
    footer: Vec<String>,
}

impl Netlist {
    pub fn new(
        title: &str,
        models: Vec<String>,
        devices: Vec<String>,
        extras: Vec<String>,
        analyses: &[Analysis],
    ) -> Self {
        let header = vec![
            format!("* {title} auto-generated netlist"),
            format!(".title {title}"),
        ];

        let mut footer = vec![
            String::new(),
            ".control".to_string(),
            "  set noaskquit".to_string(),
        ];
        for analysis in analyses {
            footer.push(format!("  {analysis}"));
            footer.push("  print all".to_string());
        }
        footer.push(".endc".to_string());
        footer.push(".end".to_string());

        Self {
            header,
            models,
            devices,
            extras,
            footer,
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn devices(&self) -> &[String] {
        &self.devices
    }

    /// All lines in deck order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.header
            .iter()
            .chain(&self.models)
            .chain(&self.devices)
            .chain(&self.extras)
            .chain(&self.footer)
            .map(String::as_str)
    }

    /// The deck as text, one line per entry, ending in `.end\n`.
    pub fn to_spice(&self) -> String {
        let mut out = String::new();
        for line in self.lines() {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for Netlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_spice())
    }
}
