//! Outcome of a code validation request

use serde::{Deserialize, Serialize};

/// Status of a validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    /// The source parsed as a complete program
    Ok,
    /// The parser rejected the source as malformed
    SyntaxError,
    /// Any parser failure not classified as a syntax error
    OtherError,
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "OK"),
            Self::SyntaxError => write!(f, "SYNTAX_ERROR"),
            Self::OtherError => write!(f, "OTHER_ERROR"),
        }
    }
}

/// Structured result of validating a block of source text.
///
/// Built per call and consumed right away by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub status: ValidationStatus,
    /// 1-based line of the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Source line the failure was reported on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offending_text: Option<String>,
    /// Raw parser error text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Advice shown to the user
    pub message: String,
}

impl ValidationOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: ValidationStatus::Ok,
            line: None,
            offending_text: None,
            detail: None,
            message: message.into(),
        }
    }

    pub fn syntax_error(
        line: usize,
        offending_text: impl Into<String>,
        detail: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status: ValidationStatus::SyntaxError,
            line: Some(line),
            offending_text: Some(offending_text.into()),
            detail: Some(detail.into()),
            message: message.into(),
        }
    }

    pub fn other_error(detail: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: ValidationStatus::OtherError,
            line: None,
            offending_text: None,
            detail: Some(detail.into()),
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ValidationStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_has_no_location() {
        let outcome = ValidationOutcome::ok("fine");
        assert!(outcome.is_ok());
        assert!(outcome.line.is_none());
        assert!(outcome.offending_text.is_none());
    }

    #[test]
    fn test_status_serializes_upper_case() {
        let outcome = ValidationOutcome::syntax_error(2, "def f(:", "invalid syntax", "check");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "SYNTAX_ERROR");
        assert_eq!(json["line"], 2);

        let json = serde_json::to_value(ValidationOutcome::ok("fine")).unwrap();
        assert!(json.get("line").is_none());
    }
}
