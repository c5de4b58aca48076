//! Validate a Python file without running it

use crate::error::{CliError, CliResult};
use crate::output::{print_single, OutputFormat};
use serde::Serialize;
use thia_engine::Thia;
use thia_types::ValidationOutcome;
use tokio::io::AsyncReadExt;

#[derive(Serialize)]
struct CheckReport<'a> {
    source: &'a str,
    #[serde(flatten)]
    outcome: &'a ValidationOutcome,
}

/// Execute check command. `-` reads the program from stdin.
pub async fn execute(thia: &Thia<'_>, path: &str, format: OutputFormat) -> CliResult<()> {
    let source = if path == "-" {
        let mut buf = Vec::new();
        tokio::io::stdin().read_to_end(&mut buf).await?;
        buf
    } else {
        tokio::fs::read(path).await?
    };

    let outcome = thia.validate_bytes(&source);
    match format {
        OutputFormat::Table => println!("{}", thia.report(&outcome)),
        _ => print_single(
            &CheckReport {
                source: if path == "-" { "<stdin>" } else { path },
                outcome: &outcome,
            },
            format,
        )?,
    }

    if outcome.is_ok() {
        Ok(())
    } else {
        Err(CliError::Rejected(outcome.status))
    }
}
