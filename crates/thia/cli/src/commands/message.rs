//! One-shot messages: `ask` and `classify`

use crate::error::CliResult;
use crate::output::{print_single, OutputFormat};
use serde::Serialize;
use thia_engine::Thia;

#[derive(Serialize)]
struct Answer<'a> {
    input: &'a str,
    category: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<String>,
}

/// Execute ask command
pub fn ask(thia: &Thia<'_>, text: &str, format: OutputFormat) -> CliResult<()> {
    let reply = thia.respond(text);
    match format {
        OutputFormat::Table => {
            println!("{}", reply);
            Ok(())
        }
        _ => {
            let category = thia.classify(text);
            print_single(
                &Answer {
                    input: text,
                    category: category.label(),
                    reply: Some(reply),
                },
                format,
            )
        }
    }
}

/// Execute classify command
pub fn classify(thia: &Thia<'_>, text: &str, format: OutputFormat) -> CliResult<()> {
    let category = thia.classify(text);
    match format {
        OutputFormat::Table => {
            println!("{}", category);
            Ok(())
        }
        _ => print_single(
            &Answer {
                input: text,
                category: category.label(),
                reply: None,
            },
            format,
        ),
    }
}
