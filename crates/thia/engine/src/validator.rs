//! Validator: syntax-only checking of pasted Python
//!
//! Parse failures never escape this module. Each one is turned into a
//! [`ValidationOutcome`] that the dispatcher renders as a reply.

use thia_pysyntax::ParseFailure;
use thia_types::{Phrasebook, ValidationOutcome, ValidationStatus};

/// Checks source text and words the verdict
#[derive(Clone, Copy, Debug)]
pub struct Validator<'c> {
    phrases: &'c Phrasebook,
}

impl<'c> Validator<'c> {
    pub fn new(phrases: &'c Phrasebook) -> Self {
        Self { phrases }
    }

    /// Parse `source` as a complete Python module. The code is never run.
    pub fn validate(&self, source: &str) -> ValidationOutcome {
        let outcome = match thia_pysyntax::check(source) {
            Ok(_) => ValidationOutcome::ok(self.phrases.advice_ok.clone()),
            Err(ParseFailure::Syntax(err)) => ValidationOutcome::syntax_error(
                err.line,
                err.text.clone(),
                format!("{}: {}", err.kind, err.message),
                self.phrases.advice_syntax_error.clone(),
            ),
            Err(other) => ValidationOutcome::other_error(
                other.to_string(),
                self.phrases.advice_other_error.clone(),
            ),
        };
        tracing::debug!(
            status = %outcome.status,
            line = ?outcome.line,
            "code validated"
        );
        outcome
    }

    /// Validate raw file contents. Bytes that are not UTF-8 are an
    /// encoding problem, not a syntax error.
    pub fn validate_bytes(&self, source: &[u8]) -> ValidationOutcome {
        match std::str::from_utf8(source) {
            Ok(source) => self.validate(source),
            Err(err) => {
                tracing::debug!(error = %err, "source is not UTF-8");
                ValidationOutcome::other_error(
                    format!("source is not valid UTF-8: {}", err),
                    self.phrases.advice_other_error.clone(),
                )
            }
        }
    }

    /// Render an outcome through the phrasebook's report template
    pub fn report(&self, outcome: &ValidationOutcome) -> String {
        let line = outcome.line.map(|l| l.to_string()).unwrap_or_default();
        let text = outcome.offending_text.as_deref().unwrap_or_default();
        let detail = outcome.detail.as_deref().unwrap_or_default();
        let template = match outcome.status {
            ValidationStatus::Ok => &self.phrases.report_ok,
            ValidationStatus::SyntaxError => &self.phrases.report_syntax_error,
            ValidationStatus::OtherError => &self.phrases.report_other_error,
        };
        fill(
            template,
            &[
                ("advice", outcome.message.as_str()),
                ("line", line.as_str()),
                ("text", text),
                ("error", detail),
            ],
        )
    }
}

/// Substitute `{name}` placeholders in one pass, so inserted text is never re-expanded
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let replacement = after.find('}').and_then(|end| {
            let key = &after[..end];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, end))
        });
        match replacement {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(source: &str) -> ValidationOutcome {
        let phrases = Phrasebook::default();
        Validator::new(&phrases).validate(source)
    }

    #[test]
    fn test_valid_code() {
        let outcome = validate("x = 1\nprint(x)");
        assert_eq!(outcome.status, ValidationStatus::Ok);
        assert!(outcome.line.is_none());
        assert!(outcome.offending_text.is_none());
    }

    #[test]
    fn test_syntax_error_location() {
        let outcome = validate("def f(:\n  pass");
        assert_eq!(outcome.status, ValidationStatus::SyntaxError);
        assert_eq!(outcome.line, Some(1));
        assert_eq!(outcome.offending_text.as_deref(), Some("def f(:"));
        assert_eq!(outcome.detail.as_deref(), Some("SyntaxError: invalid syntax"));
    }

    #[test]
    fn test_compile_time_errors_are_syntax_errors() {
        assert_eq!(validate("return 5").status, ValidationStatus::SyntaxError);
        assert_eq!(validate("break").status, ValidationStatus::SyntaxError);
        assert_eq!(validate("1 = x").status, ValidationStatus::SyntaxError);
    }

    #[test]
    fn test_indentation_error_is_syntax_error() {
        let outcome = validate("if True:\nprint('x')");
        assert_eq!(outcome.status, ValidationStatus::SyntaxError);
        assert_eq!(outcome.line, Some(2));
        assert!(outcome
            .detail
            .as_deref()
            .is_some_and(|d| d.starts_with("IndentationError")));
    }

    // Any parser failure not classified as a syntax error
    #[test]
    fn test_other_errors() {
        let outcome = validate("print('a')\0");
        assert_eq!(outcome.status, ValidationStatus::OtherError);
        assert_eq!(
            outcome.detail.as_deref(),
            Some("source code cannot contain null bytes")
        );
        assert!(outcome.line.is_none());

        let deep = format!("x = {}1{}", "[".repeat(200), "]".repeat(200));
        assert_eq!(validate(&deep).status, ValidationStatus::OtherError);

        let powers = format!("x = {}2", "2**".repeat(10_000));
        assert_eq!(validate(&powers).status, ValidationStatus::OtherError);
    }

    #[test]
    fn test_undecodable_bytes_are_other_errors() {
        let phrases = Phrasebook::default();
        let validator = Validator::new(&phrases);

        let outcome = validator.validate_bytes(b"print('ol\xe1')\n");
        assert_eq!(outcome.status, ValidationStatus::OtherError);
        assert!(outcome
            .detail
            .as_deref()
            .is_some_and(|d| d.starts_with("source is not valid UTF-8")));

        assert!(validator.validate_bytes("print('olá')\n".as_bytes()).is_ok());
    }

    #[test]
    fn test_never_runs_code() {
        let outcome = validate("while True:\n    pass\n");
        assert!(outcome.is_ok());
    }

    #[test]
    fn test_reports() {
        let phrases = Phrasebook::default();
        let validator = Validator::new(&phrases);

        let ok = validator.report(&validator.validate("x = 1"));
        assert!(ok.starts_with("✅ Seu código parece correto!"));
        assert!(ok.contains("usar funções"));

        let err = validator.report(&validator.validate("def f(:\n  pass"));
        assert_eq!(
            err,
            "❌ Encontrei um erro de sintaxe na linha 1: def f(:\n\
             Sugestão: verifique parênteses, dois pontos e indentação."
        );

        let other = validator.report(&validator.validate("\0"));
        assert!(other.contains("source code cannot contain null bytes"));
        assert!(other.ends_with("Sugestão: revise a lógica."));
    }

    #[test]
    fn test_fill_leaves_unknown_braces() {
        assert_eq!(fill("{a} {b} {", &[("a", "{b}")]), "{b} {b} {");
        assert_eq!(fill("linha {line}", &[("line", "3")]), "linha 3");
    }
}
