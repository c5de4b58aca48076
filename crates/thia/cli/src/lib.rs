//! TH IA CLI - study, programming and code-review assistant
//!
//! This CLI gives students a terminal interface to:
//! - Chat with the assistant (greetings, help, concept explanations)
//! - Ask for small example programs
//! - Paste or point at Python code and get a syntax diagnosis
//! - Inspect the catalog the assistant answers from

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;
use thia_engine::Thia;
use thia_types::Catalog;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod output;
mod repl;

use config::CliConfig;
pub use error::{CliError, CliResult};
pub use output::{print_error, OutputFormat};
pub use repl::{ExitReason, Repl};

/// TH IA CLI application
#[derive(Parser)]
#[command(name = "thia")]
#[command(about = "TH IA - Assistente de Estudos, Programação e Correção de Códigos", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "THIA_CONFIG")]
    config: Option<String>,

    /// Catalog file replacing the built-in one
    #[arg(long, env = "THIA_CATALOG")]
    catalog: Option<PathBuf>,

    /// Output format (table, json, yaml)
    #[arg(short, long, default_value = "table")]
    output: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session (default)
    Chat {
        /// Do not print the banner
        #[arg(long)]
        no_banner: bool,
    },

    /// Answer a single message
    Ask {
        /// Message text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show which category a message falls into
    Classify {
        /// Message text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Check a Python file for syntax errors without running it
    Check {
        /// File to check, or "-" for stdin
        path: String,
    },

    /// List intents, concepts and code templates
    Catalog,
}

/// Run using the current process arguments.
pub async fn run() -> CliResult<()> {
    run_with_args(std::env::args_os()).await
}

/// Run using the provided argument iterator.
pub async fn run_with_args<I, T>(args: I) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    // Initialize tracing; stdout belongs to the conversation
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    // Load config and catalog; flags win over the config file
    let config = CliConfig::load(cli.config.as_deref())?;
    let catalog = match cli.catalog.or(config.catalog.clone()) {
        Some(path) => Catalog::load(path)?,
        None => Catalog::builtin()?,
    };
    let thia = Thia::new(&catalog);

    // Execute command
    match cli.command.unwrap_or(Commands::Chat { no_banner: false }) {
        Commands::Chat { no_banner } => {
            commands::chat::execute(thia, config.show_banner && !no_banner).await
        }
        Commands::Ask { text } => commands::message::ask(&thia, &text.join(" "), cli.output),
        Commands::Classify { text } => {
            commands::message::classify(&thia, &text.join(" "), cli.output)
        }
        Commands::Check { path } => commands::check::execute(&thia, &path, cli.output).await,
        Commands::Catalog => commands::catalog::execute(&catalog, cli.output),
    }
}
