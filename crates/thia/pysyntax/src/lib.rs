//! Python Syntax Checker for TH IA
//!
//! Decides whether a piece of text is a syntactically valid Python 3
//! program and, when it is not, where the first problem is.
//!
//! # Key Principle
//!
//! **The checker reads code, it NEVER runs it.**
//!
//! Pasted programs are tokenized and parsed only. Names are not
//! resolved, imports are not followed and no expression is evaluated,
//! so checking `while True: pass` returns immediately.
//!
//! # Architecture
//!
//! - [`Lexer`]: turns source text into tokens, tracking indentation and
//!   bracket balance and reporting tokenizer errors
//! - [`Parser`]: recursive descent over the Python grammar, including
//!   the context checks CPython performs while compiling
//! - symbol tables recording what each scope binds, for the checks on
//!   `global` and `nonlocal` declarations
//!
//! Failures come in two flavours. A [`SyntaxError`] is a located problem
//! with the program text. The other [`ParseFailure`] variants mean the
//! text could not be judged at all (an embedded NUL byte, or nesting deeper
//! than [`MAX_NESTING`]).
//!
//! # Example
//!
//! ```rust
//! use thia_pysyntax::{check, ParseFailure};
//!
//! let module = check("def dobro(x):\n    return 2 * x\n").unwrap();
//! assert_eq!(module.functions, vec!["dobro".to_string()]);
//!
//! match check("def f(:\n  pass") {
//!     Err(ParseFailure::Syntax(err)) => {
//!         assert_eq!(err.line, 1);
//!         assert_eq!(err.text, "def f(:");
//!     }
//!     other => panic!("unexpected result: {:?}", other),
//! }
//! ```

#![deny(unsafe_code)]

mod errors;
mod fstring;
mod lexer;
mod parser;
mod symbols;

pub use errors::{ParseFailure, ParseResult, SyntaxError, SyntaxErrorKind};
pub use lexer::{is_keyword, LexError, Lexed, Lexer, Token, TokenKind, KEYWORDS, MAX_INDENT};
pub use parser::{ParsedModule, Parser, MAX_NESTING};

/// Check a complete Python module
pub fn check(source: &str) -> ParseResult<ParsedModule> {
    let result = Parser::parse(source);
    match &result {
        Ok(module) => tracing::debug!(
            statements = module.statements,
            functions = module.functions.len(),
            "python source parsed"
        ),
        Err(failure) => tracing::debug!(error = %failure, "python source rejected"),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_check_reports_summary() {
        let module = check("import math\n\nclass A:\n    def b(self):\n        pass\n").unwrap();
        assert_eq!(module.imports, vec!["math"]);
        assert_eq!(module.classes, vec!["A"]);
        assert_eq!(module.functions, vec!["b"]);
    }

    #[test]
    fn test_crlf_line_endings() {
        assert!(check("if x:\r\n    y = 1\r\n").is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = check("x = (1,\n").unwrap_err();
        assert_eq!(err.to_string(), "SyntaxError: '(' was never closed (line 1)");
    }

    proptest! {
        #[test]
        fn check_never_panics(source in "\\PC{0,200}") {
            let _ = check(&source);
        }

        #[test]
        fn check_never_panics_on_python_like_text(
            source in "([a-z_]{1,6}|[0-9]{1,3}|[ \t]{1,4}|\n|[()\\[\\]{}:,.=+*'\"#\\\\-]|def |if |else|for |in |return|lambda|yield|await){0,60}"
        ) {
            let _ = check(&source);
        }

        #[test]
        fn simple_assignments_are_valid(
            name in "[a-z][a-z0-9_]{0,8}",
            value in 0u32..100_000,
        ) {
            prop_assume!(!is_keyword(&name));
            let source = format!("{} = {}\nprint({})\n", name, value, name);
            prop_assert!(check(&source).is_ok());
        }

        #[test]
        fn errors_point_inside_the_source(source in "[a-z(): =\n]{0,40}") {
            if let Err(ParseFailure::Syntax(err)) = check(&source) {
                prop_assert!(err.line >= 1);
                prop_assert!(err.line <= source.lines().count().max(1));
            }
        }
    }
}
