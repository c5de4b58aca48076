//! TH IA Engine
//!
//! Turns one line of user text into one reply. Every turn is independent:
//! the engine keeps no conversation state and never mutates its catalog.
//!
//! # Architecture
//!
//! The [`Thia`] dispatcher composes specialized components:
//!
//! - [`Classifier`]: maps text to exactly one category by ordered
//!   substring rules (intents, generation markers, code markers, concepts)
//! - [`Validator`]: checks pasted Python for syntax errors without running it
//! - [`KnowledgeBase`]: finds the explanation for a known concept
//! - [`CodeGenerator`]: picks a canned program by keyword
//!
//! # Example
//!
//! ```rust
//! use thia_engine::Thia;
//! use thia_types::{Catalog, Category};
//!
//! let catalog = Catalog::builtin().unwrap();
//! let thia = Thia::new(&catalog);
//!
//! assert_eq!(thia.classify("Oi, tudo bem?"), Category::Intent("saudacao".into()));
//! assert!(thia.respond("faça um programa de fatorial").contains("def fatorial(n):"));
//! ```

#![deny(unsafe_code)]

pub mod classifier;
pub mod dispatcher;
pub mod generator;
pub mod knowledge;
pub mod validator;

pub use classifier::{Classification, Classifier};
pub use dispatcher::Thia;
pub use generator::CodeGenerator;
pub use knowledge::KnowledgeBase;
pub use validator::Validator;

/// Canonical form used for every substring comparison
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Olá MUNDO \n"), "olá mundo");
        assert_eq!(normalize("ÇÃO"), "ção");
        assert_eq!(normalize(""), "");
    }
}
