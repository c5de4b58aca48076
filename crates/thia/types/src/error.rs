//! Catalog error types

use std::path::PathBuf;

/// Errors raised while loading or checking a catalog
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Catalog parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Cannot read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported catalog format version {found} (supported: {min} to {max})")]
    UnsupportedFormat { found: u32, min: u32, max: u32 },

    #[error("Duplicate intent name: '{0}'")]
    DuplicateIntent(String),

    #[error("Intent name '{0}' is reserved for a built-in category")]
    ReservedIntentName(String),

    #[error("Duplicate concept topic: '{0}'")]
    DuplicateTopic(String),

    #[error("Intent '{0}' has no triggers")]
    NoTriggers(String),

    #[error("Intent '{0}' has no replies")]
    NoReplies(String),

    #[error("Empty {field} in {owner}")]
    EmptyField { field: &'static str, owner: String },

    #[error("No exit commands configured")]
    NoExitCommands,
}

/// Result type alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
