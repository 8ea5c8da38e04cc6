use std::ops::Range;
use std::path::Path;

use ariadne::{sources, Color, Label, Report, ReportKind};
use colored::Colorize;
use netforge_netlist::Diagnostic;

/// Status icons shared by every subcommand.
pub mod icons {
    use colored::Colorize;

    pub fn success() -> String {
        "✓".green().to_string()
    }

    pub fn error() -> String {
        "✗".red().to_string()
    }

    pub fn warning() -> String {
        "!".yellow().to_string()
    }
}

/// Report a JSON syntax error against the file it came from.
pub fn render_json_error(path: &Path, source: &str, err: &serde_json::Error) {
    let name = path.display().to_string();
    let Some(span) = line_column_span(source, err.line(), err.column()) else {
        eprintln!("{} {name}: {err}", icons::error());
        return;
    };

    let _ = Report::build(ReportKind::Error, (name.clone(), span.clone()))
        .with_message("Malformed circuit JSON")
        .with_label(
            Label::new((name.clone(), span))
                .with_message(err.to_string())
                .with_color(Color::Red),
        )
        .finish()
        .eprint(sources(vec![(name, source.to_string())]));
}

/// Report one synthesis diagnostic, pointing at the id or reference it names
/// when that text can be found in `source`.
pub fn render_diagnostic(path: &Path, source: &str, diag: &Diagnostic) {
    let name = path.display().to_string();
    let needle = match diag {
        Diagnostic::InvalidWireReference { reference, .. } => Some(reference.as_str()),
        other => other.component(),
    };
    let Some(span) = needle.and_then(|needle| quoted_span(source, needle)) else {
        eprintln!("{} {}", icons::warning(), diag.to_string().yellow());
        return;
    };

    let _ = Report::build(ReportKind::Warning, (name.clone(), span.clone()))
        .with_code(diag.code())
        .with_message(diag.to_string())
        .with_label(
            Label::new((name.clone(), span))
                .with_message(label(diag))
                .with_color(Color::Yellow),
        )
        .finish()
        .eprint(sources(vec![(name, source.to_string())]));
}

fn label(diag: &Diagnostic) -> &'static str {
    match diag {
        Diagnostic::UnknownType { .. } => "no symbol for this type",
        Diagnostic::DuplicateComponent { .. } => "id already used",
        Diagnostic::InvalidComponentId { .. } => "'.' separates component from port",
        Diagnostic::InvalidRotation { .. } => "not a quarter turn",
        Diagnostic::InvalidWireReference { .. } => "unresolved reference",
        Diagnostic::MissingPort { .. } => "port missing from symbol",
        Diagnostic::UnstampableDevice { .. } => "not stamped",
        Diagnostic::FloatingNode { .. } => "floating",
    }
}

/// Character range of the first `"needle"` string literal in `source`,
/// excluding the quotes.
fn quoted_span(source: &str, needle: &str) -> Option<Range<usize>> {
    let quoted = format!("\"{needle}\"");
    let start = source.find(&quoted)? + 1;
    let start = char_index(source, start);
    Some(start..start + needle.chars().count())
}

/// One-character range at a 1-based line and column, as serde_json reports
/// them. Column 0 means the end of the previous line.
fn line_column_span(source: &str, line: usize, column: usize) -> Option<Range<usize>> {
    if line == 0 || source.is_empty() {
        return None;
    }
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    let byte = (line_start + column.saturating_sub(1)).min(source.len() - 1);
    let start = char_index(source, byte);
    Some(start..start + 1)
}

fn char_index(source: &str, byte: usize) -> usize {
    source.char_indices().take_while(|(i, _)| *i < byte).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_quoted_ids_only() {
        let source = r#"{"from": "R1.1", "id": "R1"}"#;
        let span = quoted_span(source, "R1").unwrap();
        assert_eq!(&source[span], "R1");
        assert_eq!(quoted_span(source, "R7"), None);
    }

    #[test]
    fn json_error_position_maps_to_offset() {
        let source = "{\n  \"components\": [,]\n}";
        let err = serde_json::from_str::<serde_json::Value>(source).unwrap_err();
        let span = line_column_span(source, err.line(), err.column()).unwrap();
        assert_eq!(&source[span], ",");
    }

    #[test]
    fn offsets_count_characters() {
        let source = "{\"note\": \"µ\", \"id\": \"Q1\"}";
        let span = quoted_span(source, "Q1").unwrap();
        let text: String = source.chars().skip(span.start).take(span.len()).collect();
        assert_eq!(text, "Q1");
    }
}
