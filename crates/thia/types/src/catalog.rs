//! Static catalogs: intent registry, knowledge base, template catalog and phrasebook.
//!
//! A catalog is read from TOML once at startup and never mutated afterwards.
//! Every table keeps file order, which is the tie-break order used by the
//! classifier and the generator.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::category::RESERVED_LABELS;
use crate::error::{CatalogError, CatalogResult};

/// Oldest catalog format this build understands
pub const MIN_FORMAT_VERSION: u32 = 1;
/// Newest catalog format this build understands
pub const CURRENT_FORMAT_VERSION: u32 = 1;

const BUILTIN_CATALOG: &str = include_str!("../assets/default_catalog.toml");

/// A named conversational intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    /// Unique name, also the category label
    pub name: String,
    /// Phrases that select this intent when found in the input
    pub triggers: Vec<String>,
    /// Canned replies; the first one is used
    pub replies: Vec<String>,
}

impl Intent {
    /// The reply the dispatcher sends
    pub fn reply(&self) -> &str {
        self.replies.first().map(String::as_str).unwrap_or_default()
    }
}

/// A knowledge-base entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub topic: String,
    pub explanation: String,
}

/// A code template selected by keyword
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateEntry {
    pub keyword: String,
    pub code_text: String,
}

/// Fixed wording used by the dispatcher and the chat loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Phrasebook {
    pub banner: String,
    pub prompt: String,
    pub reply_prefix: String,
    pub unknown: String,
    pub farewell: String,
    pub interrupted_farewell: String,
    pub exit_commands: Vec<String>,
    pub advice_ok: String,
    pub advice_syntax_error: String,
    pub advice_other_error: String,
    /// Placeholder: `{advice}`
    pub report_ok: String,
    /// Placeholders: `{line}`, `{text}`, `{advice}`
    pub report_syntax_error: String,
    /// Placeholders: `{error}`, `{advice}`
    pub report_other_error: String,
}

impl Default for Phrasebook {
    fn default() -> Self {
        Self {
            banner: "TH IA — Assistente de Estudos, Programação e Correção de Códigos. \
                     Digite 'sair' para encerrar."
                .into(),
            prompt: "Você: ".into(),
            reply_prefix: "TH IA: ".into(),
            unknown: "Não entendi direito 🤔. Tente perguntar sobre programação, \
                      pedir um código ou colar um para eu avaliar."
                .into(),
            farewell: "TH IA: Até logo e bons estudos! 📚".into(),
            interrupted_farewell: "TH IA: Até a próxima! 👋".into(),
            exit_commands: vec!["sair".into(), "exit".into(), "quit".into()],
            advice_ok: "Talvez dê para melhorar com boas práticas.\n\
                        Exemplo: usar funções para organizar melhor."
                .into(),
            advice_syntax_error: "Sugestão: verifique parênteses, dois pontos e indentação.".into(),
            advice_other_error: "Sugestão: revise a lógica.".into(),
            report_ok: "✅ Seu código parece correto! {advice}".into(),
            report_syntax_error: "❌ Encontrei um erro de sintaxe na linha {line}: {text}\n{advice}"
                .into(),
            report_other_error:
                "⚠️ Seu código executa, mas encontrei um possível problema: {error}\n{advice}"
                    .into(),
        }
    }
}

impl Phrasebook {
    /// Whether `input` is one of the exit commands (case-insensitive, trimmed)
    pub fn is_exit_command(&self, input: &str) -> bool {
        let input = input.trim().to_lowercase();
        self.exit_commands.iter().any(|cmd| *cmd == input)
    }
}

fn default_generation_markers() -> Vec<String> {
    ["faça", "programa", "crie", "escreva código", "gerar código"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_code_markers() -> Vec<String> {
    ["def ", "print", "for ", "while ", "class ", "import "]
        .into_iter()
        .map(String::from)
        .collect()
}

/// All static data the assistant runs on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub format_version: u32,
    /// Markers of a code-generation request
    #[serde(default = "default_generation_markers")]
    pub generation_markers: Vec<String>,
    /// Tokens that suggest the input is source code
    #[serde(default = "default_code_markers")]
    pub code_markers: Vec<String>,
    /// Text returned when no template keyword matches
    pub fallback_template: String,
    #[serde(default)]
    pub phrases: Phrasebook,
    #[serde(default)]
    pub intents: Vec<Intent>,
    #[serde(default)]
    pub concepts: Vec<KnowledgeEntry>,
    #[serde(default)]
    pub templates: Vec<TemplateEntry>,
}

impl Catalog {
    /// The catalog compiled into the binary
    pub fn builtin() -> CatalogResult<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// Load a catalog file from disk
    pub fn load(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_toml_str(&contents)?;
        tracing::info!(
            path = %path.display(),
            intents = catalog.intents.len(),
            concepts = catalog.concepts.len(),
            templates = catalog.templates.len(),
            "Loaded catalog"
        );
        Ok(catalog)
    }

    /// Parse, normalize and check a catalog
    pub fn from_toml_str(input: &str) -> CatalogResult<Self> {
        let mut catalog: Catalog = toml::from_str(input)?;
        catalog.check_format()?;
        catalog.normalize();
        catalog.validate()?;
        Ok(catalog)
    }

    fn check_format(&self) -> CatalogResult<()> {
        if (MIN_FORMAT_VERSION..=CURRENT_FORMAT_VERSION).contains(&self.format_version) {
            Ok(())
        } else {
            Err(CatalogError::UnsupportedFormat {
                found: self.format_version,
                min: MIN_FORMAT_VERSION,
                max: CURRENT_FORMAT_VERSION,
            })
        }
    }

    // Matching keys are compared against lower-cased input. Whitespace around
    // markers is significant ("def " must not match "define").
    fn normalize(&mut self) {
        for intent in &mut self.intents {
            intent.name = intent.name.trim().to_string();
            for trigger in &mut intent.triggers {
                *trigger = trigger.trim().to_lowercase();
            }
        }
        for entry in &mut self.concepts {
            entry.topic = entry.topic.to_lowercase();
        }
        for entry in &mut self.templates {
            entry.keyword = entry.keyword.to_lowercase();
        }
        for marker in self
            .generation_markers
            .iter_mut()
            .chain(self.code_markers.iter_mut())
        {
            *marker = marker.to_lowercase();
        }
        for cmd in &mut self.phrases.exit_commands {
            *cmd = cmd.trim().to_lowercase();
        }
    }

    fn validate(&self) -> CatalogResult<()> {
        let mut names = HashSet::new();
        for intent in &self.intents {
            if intent.name.is_empty() {
                return Err(empty("name", "intent"));
            }
            if RESERVED_LABELS.contains(&intent.name.as_str()) {
                return Err(CatalogError::ReservedIntentName(intent.name.clone()));
            }
            if !names.insert(intent.name.as_str()) {
                return Err(CatalogError::DuplicateIntent(intent.name.clone()));
            }
            if intent.triggers.is_empty() {
                return Err(CatalogError::NoTriggers(intent.name.clone()));
            }
            if intent.triggers.iter().any(|t| t.trim().is_empty()) {
                return Err(empty("trigger", &format!("intent '{}'", intent.name)));
            }
            if intent.replies.is_empty() {
                return Err(CatalogError::NoReplies(intent.name.clone()));
            }
        }

        let mut topics = HashSet::new();
        for entry in &self.concepts {
            if entry.topic.trim().is_empty() {
                return Err(empty("topic", "concept"));
            }
            if !topics.insert(entry.topic.as_str()) {
                return Err(CatalogError::DuplicateTopic(entry.topic.clone()));
            }
        }

        for entry in &self.templates {
            if entry.keyword.trim().is_empty() {
                return Err(empty("keyword", "template"));
            }
        }

        if self.generation_markers.iter().any(|m| m.trim().is_empty()) {
            return Err(empty("marker", "generation_markers"));
        }
        if self.code_markers.iter().any(|m| m.trim().is_empty()) {
            return Err(empty("marker", "code_markers"));
        }

        if self.phrases.exit_commands.iter().all(String::is_empty) {
            return Err(CatalogError::NoExitCommands);
        }

        Ok(())
    }
}

fn empty(field: &'static str, owner: &str) -> CatalogError {
    CatalogError::EmptyField {
        field,
        owner: owner.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(body: &str) -> String {
        format!("format_version = 1\nfallback_template = \"nada\"\n{body}")
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        let names: Vec<_> = catalog.intents.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["saudacao", "despedida", "ajuda"]);
        assert_eq!(catalog.concepts.len(), 3);
        assert_eq!(catalog.templates.len(), 2);
        assert!(!catalog.fallback_template.is_empty());
    }

    #[test]
    fn test_builtin_keeps_file_order() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.concepts[0].topic, "listas python");
        assert_eq!(catalog.concepts[1].topic, "for python");
        assert_eq!(catalog.templates[0].keyword, "fatorial");
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let catalog = Catalog::from_toml_str(&minimal("")).unwrap();
        assert!(catalog.intents.is_empty());
        assert_eq!(catalog.code_markers, default_code_markers());
        assert_eq!(catalog.phrases, Phrasebook::default());
    }

    #[test]
    fn test_keys_are_lowercased() {
        let catalog = Catalog::from_toml_str(&minimal(
            r#"
            [[intents]]
            name = "saudacao"
            triggers = ["Bom Dia"]
            replies = ["Olá"]

            [[concepts]]
            topic = "Algoritmo"
            explanation = "passos"
            "#,
        ))
        .unwrap();
        assert_eq!(catalog.intents[0].triggers, vec!["bom dia"]);
        assert_eq!(catalog.concepts[0].topic, "algoritmo");
    }

    #[test]
    fn test_unsupported_format_version() {
        let err = Catalog::from_toml_str("format_version = 99\nfallback_template = \"x\"")
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::UnsupportedFormat { found: 99, .. }
        ));
    }

    #[test]
    fn test_duplicate_intent_rejected() {
        let err = Catalog::from_toml_str(&minimal(
            r#"
            [[intents]]
            name = "a"
            triggers = ["x"]
            replies = ["y"]

            [[intents]]
            name = "a"
            triggers = ["z"]
            replies = ["w"]
            "#,
        ))
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateIntent(name) if name == "a"));
    }

    #[test]
    fn test_intent_without_triggers_rejected() {
        let err = Catalog::from_toml_str(&minimal(
            r#"
            [[intents]]
            name = "a"
            triggers = []
            replies = ["y"]
            "#,
        ))
        .unwrap_err();
        assert!(matches!(err, CatalogError::NoTriggers(_)));
    }

    #[test]
    fn test_intent_without_replies_rejected() {
        let err = Catalog::from_toml_str(&minimal(
            r#"
            [[intents]]
            name = "a"
            triggers = ["x"]
            replies = []
            "#,
        ))
        .unwrap_err();
        assert!(matches!(err, CatalogError::NoReplies(_)));
    }

    #[test]
    fn test_reserved_intent_name_rejected() {
        let err = Catalog::from_toml_str(&minimal(
            r#"
            [[intents]]
            name = "conceito"
            triggers = ["x"]
            replies = ["y"]
            "#,
        ))
        .unwrap_err();
        assert!(matches!(err, CatalogError::ReservedIntentName(_)));
    }

    #[test]
    fn test_empty_template_keyword_rejected() {
        let err = Catalog::from_toml_str(&minimal(
            r#"
            [[templates]]
            keyword = "  "
            code_text = "print(1)"
            "#,
        ))
        .unwrap_err();
        assert!(matches!(err, CatalogError::EmptyField { field: "keyword", .. }));
    }

    #[test]
    fn test_duplicate_topic_rejected() {
        let err = Catalog::from_toml_str(&minimal(
            r#"
            [[concepts]]
            topic = "algoritmo"
            explanation = "a"

            [[concepts]]
            topic = "ALGORITMO"
            explanation = "b"
            "#,
        ))
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateTopic(_)));
    }

    #[test]
    fn test_exit_commands_case_insensitive() {
        let phrases = Phrasebook::default();
        assert!(phrases.is_exit_command("SAIR"));
        assert!(phrases.is_exit_command("  Quit "));
        assert!(!phrases.is_exit_command("sair agora"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Catalog::load("/nonexistent/thia/catalog.toml").unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }
}
