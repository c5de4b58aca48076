//! Catalog listing

use crate::error::CliResult;
use crate::output::{print_output, OutputFormat};
use colored::Colorize;
use serde::Serialize;
use tabled::Tabled;
use thia_types::Catalog;

const PREVIEW_CHARS: usize = 60;

/// One catalog entry as listed by `thia catalog`
#[derive(Debug, Serialize, Tabled)]
pub struct EntryRow {
    #[tabled(rename = "Table")]
    pub table: &'static str,
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Content")]
    pub content: String,
}

/// Flatten the catalog into rows, in matching order
pub fn rows(catalog: &Catalog) -> Vec<EntryRow> {
    let intents = catalog.intents.iter().map(|intent| EntryRow {
        table: "intent",
        key: intent.name.clone(),
        content: intent.triggers.join(", "),
    });
    let concepts = catalog.concepts.iter().map(|entry| EntryRow {
        table: "concept",
        key: entry.topic.clone(),
        content: preview(&entry.explanation),
    });
    let templates = catalog.templates.iter().map(|entry| EntryRow {
        table: "template",
        key: entry.keyword.clone(),
        content: preview(&entry.code_text),
    });
    intents.chain(concepts).chain(templates).collect()
}

/// Execute catalog command
pub fn execute(catalog: &Catalog, format: OutputFormat) -> CliResult<()> {
    if format == OutputFormat::Table {
        println!(
            "{} (format version {})",
            "TH IA catalog".bold().cyan(),
            catalog.format_version
        );
    }
    print_output(rows(catalog), format)
}

// First non-blank line, shortened
fn preview(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default();
    if line.chars().count() > PREVIEW_CHARS {
        let short: String = line.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", short)
    } else {
        line.to_string()
    }
}
