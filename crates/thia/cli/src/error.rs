//! CLI error types

use thia_types::{CatalogError, ValidationStatus};
use thiserror::Error;

/// CLI error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Catalog(#[from] CatalogError),

    #[error("Code validation failed: {0}")]
    Rejected(ValidationStatus),
}

impl CliError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Rejected(_) => 2,
            _ => 1,
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
