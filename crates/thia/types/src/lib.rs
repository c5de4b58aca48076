//! TH IA Types
//!
//! Shared data model for the assistant:
//! - [`Catalog`]: intent registry, knowledge base, template catalog and
//!   phrasebook, loaded once and treated as read-only configuration
//! - [`Category`]: the single label an input is classified into
//! - [`ValidationOutcome`]: structured result of checking pasted code

#![deny(unsafe_code)]

mod catalog;
mod category;
mod error;
mod validation;

pub use catalog::{
    Catalog, Intent, KnowledgeEntry, Phrasebook, TemplateEntry, CURRENT_FORMAT_VERSION,
    MIN_FORMAT_VERSION,
};
pub use category::{
    Category, CONCEPT_LABEL, GENERATE_CODE_LABEL, RESERVED_LABELS, UNKNOWN_LABEL,
    VALIDATE_CODE_LABEL,
};
pub use error::{CatalogError, CatalogResult};
pub use validation::{ValidationOutcome, ValidationStatus};
