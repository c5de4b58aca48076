//! Code generator: canned programs selected by keyword

use thia_types::{Catalog, TemplateEntry};

use crate::normalize;

/// Picks a template for a code-generation request
#[derive(Clone, Copy, Debug)]
pub struct CodeGenerator<'c> {
    templates: &'c [TemplateEntry],
    fallback: &'c str,
}

impl<'c> CodeGenerator<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self {
            templates: &catalog.templates,
            fallback: &catalog.fallback_template,
        }
    }

    /// Code text of the first template whose keyword occurs in `request`,
    /// or the fallback text when none does.
    pub fn generate(&self, request: &str) -> &'c str {
        let request = normalize(request);
        match self
            .templates
            .iter()
            .find(|template| request.contains(template.keyword.as_str()))
        {
            Some(template) => {
                tracing::debug!(keyword = %template.keyword, "template selected");
                &template.code_text
            }
            None => {
                tracing::debug!("no template matched, using fallback");
                self.fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factorial_template() {
        let catalog = Catalog::builtin().unwrap();
        let generator = CodeGenerator::new(&catalog);
        let code = generator.generate("Faça um programa de FATORIAL");
        assert!(code.contains("def fatorial(n):"));
        assert!(code.contains("return n * fatorial(n-1)"));
    }

    #[test]
    fn test_sort_template() {
        let catalog = Catalog::builtin().unwrap();
        let generator = CodeGenerator::new(&catalog);
        assert!(generator.generate("crie um código para ordenar").contains("numeros.sort()"));
    }

    #[test]
    fn test_fallback() {
        let catalog = Catalog::builtin().unwrap();
        let generator = CodeGenerator::new(&catalog);
        assert_eq!(
            generator.generate("crie algo aleatório"),
            catalog.fallback_template
        );
        assert_eq!(generator.generate(""), catalog.fallback_template);
    }

    #[test]
    fn test_first_keyword_wins() {
        let catalog = Catalog::builtin().unwrap();
        let generator = CodeGenerator::new(&catalog);
        let code = generator.generate("ordenar e depois fatorial");
        assert_eq!(code, catalog.templates[0].code_text);
    }
}
