//! Classifier: ordered substring rules mapping text to one category
//!
//! Rule groups are tried in a fixed priority order and the first match
//! wins:
//!
//! 1. fixed intents, in registry order
//! 2. code-generation markers
//! 3. code markers (a permissive "looks like code" heuristic)
//! 4. knowledge-base topics, in catalog order
//! 5. otherwise unknown
//!
//! Because intents come first, pasted code that happens to contain a
//! greeting trigger (`print('oi')`) is answered as a greeting.

use thia_types::{Catalog, Category, Intent, KnowledgeEntry};

use crate::knowledge::KnowledgeBase;
use crate::normalize;

/// Result of classifying one input, with the catalog entry that matched
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification<'c> {
    Intent(&'c Intent),
    GenerateCode,
    ValidateCode,
    Concept(&'c KnowledgeEntry),
    Unknown,
}

impl Classification<'_> {
    pub fn category(&self) -> Category {
        match self {
            Self::Intent(intent) => Category::Intent(intent.name.clone()),
            Self::GenerateCode => Category::GenerateCode,
            Self::ValidateCode => Category::ValidateCode,
            Self::Concept(_) => Category::Concept,
            Self::Unknown => Category::Unknown,
        }
    }
}

/// Priority-ordered classifier over a catalog
#[derive(Clone, Copy, Debug)]
pub struct Classifier<'c> {
    catalog: &'c Catalog,
    knowledge: KnowledgeBase<'c>,
}

impl<'c> Classifier<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            knowledge: KnowledgeBase::new(&catalog.concepts),
        }
    }

    /// Category of `text`. Total and deterministic.
    pub fn classify(&self, text: &str) -> Category {
        self.classify_detailed(text).category()
    }

    /// Classify `text`, keeping the matched intent or concept
    pub fn classify_detailed(&self, text: &str) -> Classification<'c> {
        let input = normalize(text);
        let classification = self.apply_rules(&input);
        tracing::debug!(category = %classification.category(), "input classified");
        classification
    }

    fn apply_rules(&self, input: &str) -> Classification<'c> {
        if let Some(intent) = self
            .catalog
            .intents
            .iter()
            .find(|intent| contains_any(input, &intent.triggers))
        {
            return Classification::Intent(intent);
        }

        if contains_any(input, &self.catalog.generation_markers) {
            return Classification::GenerateCode;
        }

        if contains_any(input, &self.catalog.code_markers) {
            return Classification::ValidateCode;
        }

        match self.knowledge.find(input) {
            Some(entry) => Classification::Concept(entry),
            None => Classification::Unknown,
        }
    }
}

fn contains_any(input: &str, needles: &[String]) -> bool {
    needles.iter().any(|needle| input.contains(needle.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn classify(text: &str) -> Category {
        let catalog = Catalog::builtin().unwrap();
        Classifier::new(&catalog).classify(text)
    }

    #[test]
    fn test_intents() {
        assert_eq!(classify("Olá!"), Category::Intent("saudacao".into()));
        assert_eq!(classify("  BOM DIA  "), Category::Intent("saudacao".into()));
        assert_eq!(classify("valeu, tchau"), Category::Intent("despedida".into()));
        assert_eq!(classify("como usar isso?"), Category::Intent("ajuda".into()));
    }

    #[test]
    fn test_registry_order_breaks_ties() {
        // "oi" (saudacao) and "tchau" (despedida) both occur
        assert_eq!(classify("oi e tchau"), Category::Intent("saudacao".into()));
    }

    #[test]
    fn test_generation_request() {
        assert_eq!(classify("Faça um programa de fatorial"), Category::GenerateCode);
        assert_eq!(classify("crie uma calculadora"), Category::GenerateCode);
    }

    #[test]
    fn test_generation_outranks_code_markers() {
        assert_eq!(classify("escreva código com print"), Category::GenerateCode);
    }

    #[test]
    fn test_code_detection() {
        assert_eq!(classify("def soma(a, b): return a + b"), Category::ValidateCode);
        assert_eq!(classify("import os"), Category::ValidateCode);
        assert_eq!(classify("x = 1; print(x)"), Category::ValidateCode);
    }

    #[test]
    fn test_intents_outrank_code_detection() {
        assert_eq!(classify("print('oi')"), Category::Intent("saudacao".into()));
    }

    #[test]
    fn test_marker_whitespace_is_significant() {
        assert_eq!(classify("define algoritmo"), Category::Concept);
    }

    #[test]
    fn test_concepts() {
        assert_eq!(classify("o que é um algoritmo?"), Category::Concept);
        assert_eq!(classify("listas python"), Category::Concept);
    }

    #[test]
    fn test_for_topic_is_shadowed_by_code_marker() {
        assert_eq!(classify("for python"), Category::ValidateCode);
    }

    #[test]
    fn test_unknown() {
        assert_eq!(classify("qual a capital da frança?"), Category::Unknown);
        assert_eq!(classify(""), Category::Unknown);
        assert_eq!(classify("   "), Category::Unknown);
    }

    #[test]
    fn test_detailed_captures_entries() {
        let catalog = Catalog::builtin().unwrap();
        let classifier = Classifier::new(&catalog);

        match classifier.classify_detailed("explique listas python") {
            Classification::Concept(entry) => assert_eq!(entry.topic, "listas python"),
            other => panic!("expected a concept, got {:?}", other),
        }
        match classifier.classify_detailed("ajuda") {
            Classification::Intent(intent) => assert_eq!(intent.name, "ajuda"),
            other => panic!("expected an intent, got {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn classify_is_total_and_deterministic(text in "\\PC{0,80}") {
            let catalog = Catalog::builtin().unwrap();
            let classifier = Classifier::new(&catalog);
            prop_assert_eq!(classifier.classify(&text), classifier.classify(&text));
        }

        #[test]
        fn classify_ignores_case_and_padding(text in "[a-zA-Z ]{0,40}") {
            let catalog = Catalog::builtin().unwrap();
            let classifier = Classifier::new(&catalog);
            let padded = format!("  {}  ", text.to_uppercase());
            prop_assert_eq!(classifier.classify(&padded), classifier.classify(&text));
        }
    }
}
