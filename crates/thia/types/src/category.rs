//! Classification categories

use serde::{Deserialize, Serialize};

/// Label for code-generation requests
pub const GENERATE_CODE_LABEL: &str = "gerar_codigo";
/// Label for pasted code that should be validated
pub const VALIDATE_CODE_LABEL: &str = "avaliar_codigo";
/// Label for questions about a known concept
pub const CONCEPT_LABEL: &str = "conceito";
/// Label for input no rule matched
pub const UNKNOWN_LABEL: &str = "desconhecido";

/// Labels that intents may not use as their name
pub const RESERVED_LABELS: [&str; 4] = [
    GENERATE_CODE_LABEL,
    VALIDATE_CODE_LABEL,
    CONCEPT_LABEL,
    UNKNOWN_LABEL,
];

/// The single category an input is mapped to.
///
/// Produced fresh for every input; never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "intent", rename_all = "snake_case")]
pub enum Category {
    /// One of the registry's fixed intents, by name
    Intent(String),
    /// The user asked for a generated code sample
    GenerateCode,
    /// The input looks like source code
    ValidateCode,
    /// The input mentions a knowledge-base topic
    Concept,
    /// Nothing matched
    Unknown,
}

impl Category {
    /// Stable label used in logs and CLI output
    pub fn label(&self) -> &str {
        match self {
            Self::Intent(name) => name,
            Self::GenerateCode => GENERATE_CODE_LABEL,
            Self::ValidateCode => VALIDATE_CODE_LABEL,
            Self::Concept => CONCEPT_LABEL,
            Self::Unknown => UNKNOWN_LABEL,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(Category::Intent("saudacao".into()).label(), "saudacao");
        assert_eq!(Category::GenerateCode.to_string(), "gerar_codigo");
        assert_eq!(Category::ValidateCode.to_string(), "avaliar_codigo");
        assert_eq!(Category::Concept.to_string(), "conceito");
        assert_eq!(Category::Unknown.to_string(), "desconhecido");
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(Category::Intent("ajuda".into())).unwrap();
        assert_eq!(json["kind"], "intent");
        assert_eq!(json["intent"], "ajuda");

        let json = serde_json::to_value(Category::Concept).unwrap();
        assert_eq!(json["kind"], "concept");
    }
}
