//! Knowledge base: concept explanations keyed by topic

use thia_types::KnowledgeEntry;

use crate::normalize;

/// Read-only view over the catalog's concepts
#[derive(Clone, Copy, Debug)]
pub struct KnowledgeBase<'c> {
    entries: &'c [KnowledgeEntry],
}

impl<'c> KnowledgeBase<'c> {
    pub fn new(entries: &'c [KnowledgeEntry]) -> Self {
        Self { entries }
    }

    /// Explanation of the first topic contained in `text`, in catalog order
    pub fn lookup(&self, text: &str) -> Option<&'c str> {
        self.find(&normalize(text))
            .map(|entry| entry.explanation.as_str())
    }

    /// First entry whose topic occurs in already-normalized input
    pub(crate) fn find(&self, normalized: &str) -> Option<&'c KnowledgeEntry> {
        self.entries
            .iter()
            .find(|entry| normalized.contains(entry.topic.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thia_types::Catalog;

    #[test]
    fn test_lookup_returns_explanation_verbatim() {
        let catalog = Catalog::builtin().unwrap();
        let kb = KnowledgeBase::new(&catalog.concepts);
        let explanation = kb.lookup("Me explica o FOR PYTHON").unwrap();
        assert_eq!(explanation, catalog.concepts[1].explanation);
        assert!(explanation.contains("for i in range(5):"));
    }

    #[test]
    fn test_lookup_without_match() {
        let catalog = Catalog::builtin().unwrap();
        let kb = KnowledgeBase::new(&catalog.concepts);
        assert_eq!(kb.lookup("o que é recursão?"), None);
        assert_eq!(kb.lookup(""), None);
    }

    #[test]
    fn test_first_topic_in_catalog_order_wins() {
        let entries = vec![
            KnowledgeEntry {
                topic: "lista".into(),
                explanation: "primeira".into(),
            },
            KnowledgeEntry {
                topic: "algoritmo".into(),
                explanation: "segunda".into(),
            },
        ];
        let kb = KnowledgeBase::new(&entries);
        assert_eq!(kb.lookup("algoritmo de lista"), Some("primeira"));
    }
}
