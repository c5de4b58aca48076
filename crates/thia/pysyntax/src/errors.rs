//! Parse failure types

/// Flavour of a syntax error, mirroring the Python exception hierarchy
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    Syntax,
    Indentation,
    Tab,
}

impl std::fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Syntax => write!(f, "SyntaxError"),
            Self::Indentation => write!(f, "IndentationError"),
            Self::Tab => write!(f, "TabError"),
        }
    }
}

/// A located syntax error
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message} (line {line})")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub message: String,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub col: usize,
    /// Source line the error points at, without the line break
    pub text: String,
}

/// Message used when no more specific diagnosis applies
pub(crate) const INVALID_SYNTAX: &str = "invalid syntax";

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, message: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
            col,
            text: String::new(),
        }
    }

    pub fn syntax(message: impl Into<String>, line: usize, col: usize) -> Self {
        Self::new(SyntaxErrorKind::Syntax, message, line, col)
    }

    pub fn indentation(message: impl Into<String>, line: usize, col: usize) -> Self {
        Self::new(SyntaxErrorKind::Indentation, message, line, col)
    }

    /// Whether this is the catch-all "invalid syntax" diagnosis
    pub fn is_generic(&self) -> bool {
        self.kind == SyntaxErrorKind::Syntax && self.message == INVALID_SYNTAX
    }

    /// Fill in `text`; errors found at end of input move to the last non-blank line
    pub(crate) fn with_source_line(mut self, source: &str) -> Self {
        let lines: Vec<&str> = source.lines().collect();
        match lines.get(self.line.saturating_sub(1)) {
            Some(line) => self.text = line.trim().to_string(),
            None => {
                if let Some((index, line)) = lines
                    .iter()
                    .enumerate()
                    .rev()
                    .find(|(_, line)| !line.trim().is_empty())
                {
                    self.line = index + 1;
                    self.col = line.trim_end().chars().count() + 1;
                    self.text = line.trim().to_string();
                }
            }
        }
        self
    }
}

/// Why a source text could not be parsed
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    /// The text is not a well-formed program
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("source code cannot contain null bytes")]
    NullByte,

    #[error("maximum nesting depth of {0} exceeded during parsing")]
    TooDeep(usize),
}

/// Result type alias for parsing operations
pub type ParseResult<T> = Result<T, ParseFailure>;
