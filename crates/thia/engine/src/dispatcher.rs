//! Dispatcher: one reply per input

use thia_types::{Catalog, Category, ValidationOutcome};

use crate::classifier::{Classification, Classifier};
use crate::generator::CodeGenerator;
use crate::knowledge::KnowledgeBase;
use crate::validator::Validator;

/// The assistant. Holds the catalog by shared reference and no other state,
/// so the same input always gets the same reply.
#[derive(Clone, Copy, Debug)]
pub struct Thia<'c> {
    catalog: &'c Catalog,
    classifier: Classifier<'c>,
    validator: Validator<'c>,
    knowledge: KnowledgeBase<'c>,
    generator: CodeGenerator<'c>,
}

impl<'c> Thia<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            classifier: Classifier::new(catalog),
            validator: Validator::new(&catalog.phrases),
            knowledge: KnowledgeBase::new(&catalog.concepts),
            generator: CodeGenerator::new(catalog),
        }
    }

    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    pub fn classify(&self, text: &str) -> Category {
        self.classifier.classify(text)
    }

    pub fn validate(&self, source: &str) -> ValidationOutcome {
        self.validator.validate(source)
    }

    pub fn validate_bytes(&self, source: &[u8]) -> ValidationOutcome {
        self.validator.validate_bytes(source)
    }

    /// Word a validation outcome the way the chat does
    pub fn report(&self, outcome: &ValidationOutcome) -> String {
        self.validator.report(outcome)
    }

    pub fn lookup(&self, text: &str) -> Option<&'c str> {
        self.knowledge.lookup(text)
    }

    pub fn generate(&self, request: &str) -> &'c str {
        self.generator.generate(request)
    }

    /// Reply to one line of user text
    pub fn respond(&self, text: &str) -> String {
        match self.classifier.classify_detailed(text) {
            Classification::Intent(intent) => intent.reply().to_string(),
            Classification::GenerateCode => self.generator.generate(text).to_string(),
            Classification::ValidateCode => {
                let outcome = self.validator.validate(text);
                self.validator.report(&outcome)
            }
            Classification::Concept(entry) => entry.explanation.clone(),
            Classification::Unknown => self.catalog.phrases.unknown.clone(),
        }
    }
}
