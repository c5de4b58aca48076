//! Lexer: tokenizes Python source
//!
//! Produces the token stream the parser consumes, including the
//! NEWLINE / INDENT / DEDENT tokens that carry Python's block structure.
//! Lexing stops at the first error; the stream then ends with an
//! [`TokenKind::Error`] token and the error is kept in [`Lexed::error`].

use crate::errors::{SyntaxError, SyntaxErrorKind, INVALID_SYNTAX};

/// Maximum indentation depth, as in CPython's tokenizer
pub const MAX_INDENT: usize = 100;

const TAB_SIZE: usize = 8;

/// A token produced by the lexer
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The raw text of the token
    pub text: String,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            col,
        }
    }
}

/// Token types
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword
    Name,
    Number,
    String,
    /// Operator or delimiter
    Op,
    Newline,
    Indent,
    Dedent,
    EndMarker,
    /// Lexing stopped here
    Error,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Number => write!(f, "number"),
            Self::String => write!(f, "string"),
            Self::Op => write!(f, "operator"),
            Self::Newline => write!(f, "newline"),
            Self::Indent => write!(f, "indent"),
            Self::Dedent => write!(f, "dedent"),
            Self::EndMarker => write!(f, "end of input"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Python's reserved words
pub const KEYWORDS: [&str; 35] = [
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

pub fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

const THREE_CHAR_OPS: [&str; 5] = ["**=", "//=", ">>=", "<<=", "..."];
const TWO_CHAR_OPS: [&str; 19] = [
    "**", "//", ">>", "<<", "<=", ">=", "==", "!=", "->", ":=", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "@=",
];
const ONE_CHAR_OPS: &str = "+-*/%@&|^~<>()[]{},:;.=";

const STRING_PREFIXES: [&str; 9] = ["r", "u", "b", "br", "rb", "f", "fr", "rf", ""];

/// Error that stopped the lexer
#[derive(Clone, Debug, PartialEq)]
pub struct LexError {
    pub error: SyntaxError,
    /// Whether this error should replace a generic parser diagnosis
    /// reported earlier in the source
    pub overrides_generic: bool,
}

/// Output of a lexing run
#[derive(Clone, Debug)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub error: Option<LexError>,
}

/// Lexer for Python source text
pub struct Lexer {
    input: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    tokens: Vec<Token>,
    /// Indentation widths: (tabs to 8, tabs to 1)
    indents: Vec<(usize, usize)>,
    /// Open brackets with their position
    brackets: Vec<(char, usize, usize)>,
    at_line_start: bool,
}

impl Lexer {
    /// Create a new lexer from input text
    pub fn new(input: &str) -> Self {
        let normalized = input.replace("\r\n", "\n").replace('\r', "\n");
        Self {
            input: normalized.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            tokens: Vec::new(),
            indents: vec![(0, 0)],
            brackets: Vec::new(),
            at_line_start: true,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(mut self) -> Lexed {
        match self.run() {
            Ok(()) => Lexed {
                tokens: self.tokens,
                error: None,
            },
            Err(lex_error) => {
                let (line, col) = (self.line, self.col);
                self.tokens
                    .push(Token::new(TokenKind::Error, "", line, col));
                Lexed {
                    tokens: self.tokens,
                    error: Some(lex_error),
                }
            }
        }
    }

    fn run(&mut self) -> Result<(), LexError> {
        loop {
            if self.at_line_start && self.brackets.is_empty() {
                let (width, alt_width) = self.measure_indent();
                match self.peek() {
                    None => break,
                    Some('#') => {
                        self.skip_comment();
                        continue;
                    }
                    Some('\n') => {
                        self.advance();
                        continue;
                    }
                    Some(_) => {
                        self.handle_indent(width, alt_width).map_err(overriding)?;
                        self.at_line_start = false;
                    }
                }
            }

            self.skip_inline_whitespace();
            let Some(ch) = self.peek() else { break };
            let (line, col) = (self.line, self.col);

            match ch {
                '#' => self.skip_comment(),
                '\n' => {
                    self.advance();
                    if self.brackets.is_empty() {
                        self.push(TokenKind::Newline, "", line, col);
                        self.at_line_start = true;
                    }
                }
                '\\' => match self.peek_at(1) {
                    Some('\n') => {
                        self.advance();
                        self.advance();
                    }
                    None => {
                        return Err(overriding(SyntaxError::syntax(
                            "unexpected EOF while parsing",
                            line,
                            col,
                        )))
                    }
                    Some(_) => {
                        return Err(overriding(SyntaxError::syntax(
                            "unexpected character after line continuation character",
                            line,
                            col,
                        )))
                    }
                },
                '\'' | '"' => self.read_string("", line, col).map_err(overriding)?,
                c if c.is_ascii_digit() => self.read_number().map_err(overriding)?,
                '.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                    self.read_number().map_err(overriding)?
                }
                c if is_ident_start(c) => self.read_name_or_prefixed_string().map_err(overriding)?,
                _ => self.read_operator().map_err(overriding)?,
            }
        }

        if let Some(&(open, line, col)) = self.brackets.last() {
            return Err(LexError {
                error: SyntaxError::syntax(format!("'{}' was never closed", open), line, col),
                overrides_generic: false,
            });
        }

        let (line, col) = (self.line, self.col);
        if !self.at_line_start {
            self.push(TokenKind::Newline, "", line, col);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, "", line, col);
        }
        self.push(TokenKind::EndMarker, "", line, col);
        Ok(())
    }

    fn measure_indent(&mut self) -> (usize, usize) {
        let mut width = 0;
        let mut alt_width = 0;
        while let Some(ch) = self.peek() {
            match ch {
                ' ' => {
                    width += 1;
                    alt_width += 1;
                }
                '\t' => {
                    width = (width / TAB_SIZE + 1) * TAB_SIZE;
                    alt_width += 1;
                }
                '\x0c' => {
                    width = 0;
                    alt_width = 0;
                }
                _ => break,
            }
            self.advance();
        }
        (width, alt_width)
    }

    fn handle_indent(&mut self, width: usize, alt_width: usize) -> Result<(), SyntaxError> {
        let (line, col) = (self.line, self.col);
        let tab_error = || {
            SyntaxError::new(
                SyntaxErrorKind::Tab,
                "inconsistent use of tabs and spaces in indentation",
                line,
                col,
            )
        };

        let (top, top_alt) = self.current_indent();
        if width == top {
            if alt_width != top_alt {
                return Err(tab_error());
            }
        } else if width > top {
            if alt_width <= top_alt {
                return Err(tab_error());
            }
            if self.indents.len() > MAX_INDENT {
                return Err(SyntaxError::indentation(
                    "too many levels of indentation",
                    line,
                    col,
                ));
            }
            self.indents.push((width, alt_width));
            self.push(TokenKind::Indent, "", line, col);
        } else {
            while width < self.current_indent().0 {
                self.indents.pop();
                self.push(TokenKind::Dedent, "", line, col);
            }
            let (top, top_alt) = self.current_indent();
            if width != top {
                return Err(SyntaxError::indentation(
                    "unindent does not match any outer indentation level",
                    line,
                    col,
                ));
            }
            if alt_width != top_alt {
                return Err(tab_error());
            }
        }
        Ok(())
    }

    fn current_indent(&self) -> (usize, usize) {
        self.indents.last().copied().unwrap_or((0, 0))
    }

    fn read_name_or_prefixed_string(&mut self) -> Result<(), SyntaxError> {
        let line = self.line;
        let col = self.col;
        let mut text = String::new();

        while let Some(c) = self.peek() {
            if !is_ident_continue(c) {
                break;
            }
            text.push(c);
            self.advance();
        }

        if matches!(self.peek(), Some('\'' | '"'))
            && STRING_PREFIXES.contains(&text.to_ascii_lowercase().as_str())
        {
            return self.read_string(&text, line, col);
        }

        self.push(TokenKind::Name, text, line, col);
        Ok(())
    }

    fn read_string(&mut self, prefix: &str, line: usize, col: usize) -> Result<(), SyntaxError> {
        let quote = self.peek().unwrap_or('"');
        let triple = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        let is_bytes = prefix.to_ascii_lowercase().contains('b');

        let mut text = String::from(prefix);
        let quote_len = if triple { 3 } else { 1 };
        for _ in 0..quote_len {
            text.push(quote);
            self.advance();
        }

        loop {
            let Some(ch) = self.peek() else {
                let message = if triple {
                    format!(
                        "unterminated triple-quoted string literal (detected at line {})",
                        self.line
                    )
                } else {
                    format!("unterminated string literal (detected at line {})", self.line)
                };
                return Err(SyntaxError::syntax(message, line, col));
            };

            if ch == '\n' && !triple {
                return Err(SyntaxError::syntax(
                    format!("unterminated string literal (detected at line {})", self.line),
                    line,
                    col,
                ));
            }

            if is_bytes && !ch.is_ascii() {
                return Err(SyntaxError::syntax(
                    "bytes can only contain ASCII literal characters",
                    line,
                    col,
                ));
            }

            if ch == '\\' {
                text.push(ch);
                self.advance();
                if let Some(escaped) = self.peek() {
                    text.push(escaped);
                    self.advance();
                }
                continue;
            }

            if ch == quote
                && (!triple || (self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote)))
            {
                for _ in 0..quote_len {
                    text.push(quote);
                    self.advance();
                }
                break;
            }

            text.push(ch);
            self.advance();
        }

        self.push(TokenKind::String, text, line, col);
        Ok(())
    }

    fn read_number(&mut self) -> Result<(), SyntaxError> {
        let line = self.line;
        let col = self.col;
        let mut text = String::new();

        if self.peek() == Some('0')
            && matches!(self.peek_at(1), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B'))
        {
            let radix_char = self.peek_at(1).unwrap_or('x').to_ascii_lowercase();
            let (radix, name) = match radix_char {
                'x' => (16, "hexadecimal"),
                'o' => (8, "octal"),
                _ => (2, "binary"),
            };
            text.push(self.advance_char());
            text.push(self.advance_char());
            let digits = self.read_digits(|c| c.is_digit(radix));
            if digits.is_empty() || digits.ends_with('_') || digits.contains("__") {
                return Err(SyntaxError::syntax(format!("invalid {} literal", name), line, col));
            }
            text.push_str(&digits);
            if self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) && !self.keyword_follows() {
                return Err(SyntaxError::syntax(format!("invalid {} literal", name), line, col));
            }
            self.push(TokenKind::Number, text, line, col);
            return Ok(());
        }

        let integer = self.read_digits(|c| c.is_ascii_digit());
        text.push_str(&integer);
        let mut is_plain_integer = true;

        if self.peek() == Some('.') {
            is_plain_integer = false;
            text.push(self.advance_char());
            text.push_str(&self.read_digits(|c| c.is_ascii_digit()));
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let sign_offset = usize::from(matches!(self.peek_at(1), Some('+' | '-')));
            if self
                .peek_at(1 + sign_offset)
                .is_some_and(|c| c.is_ascii_digit())
            {
                is_plain_integer = false;
                text.push(self.advance_char());
                if sign_offset == 1 {
                    text.push(self.advance_char());
                }
                text.push_str(&self.read_digits(|c| c.is_ascii_digit()));
            } else if sign_offset == 1 || !self.keyword_follows() {
                return Err(SyntaxError::syntax("invalid decimal literal", line, col));
            }
        }

        if matches!(self.peek(), Some('j' | 'J')) {
            is_plain_integer = false;
            text.push(self.advance_char());
        }

        if text.ends_with('_') || text.contains("__") || text.contains("_.") || text.contains("._")
        {
            return Err(SyntaxError::syntax("invalid decimal literal", line, col));
        }

        if self.peek().is_some_and(is_ident_continue) && !self.keyword_follows() {
            return Err(SyntaxError::syntax("invalid decimal literal", line, col));
        }

        if is_plain_integer
            && integer.len() > 1
            && integer.starts_with('0')
            && integer.chars().any(|c| c != '0' && c != '_')
        {
            return Err(SyntaxError::syntax(
                "leading zeros in decimal integer literals are not permitted; \
                 use an 0o prefix for octal integers",
                line,
                col,
            ));
        }

        self.push(TokenKind::Number, text, line, col);
        Ok(())
    }

    /// A keyword that may directly follow a number, as in `1if x else 2`.
    /// Only the start of the word is looked at; what comes after is the
    /// parser's problem.
    fn keyword_follows(&self) -> bool {
        let rest = |word: &str| {
            word.chars()
                .enumerate()
                .all(|(offset, c)| self.peek_at(offset) == Some(c))
        };
        match self.peek() {
            Some('a') => rest("and"),
            Some('e') => rest("else"),
            Some('f') => rest("for"),
            Some('i') => matches!(self.peek_at(1), Some('f' | 'n' | 's')),
            Some('n') => rest("not"),
            Some('o') => rest("or"),
            _ => false,
        }
    }

    fn read_digits(&mut self, is_digit: impl Fn(char) -> bool) -> String {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if is_digit(c) || c == '_' {
                digits.push(c);
                self.advance();
            } else {
                break;
            }
        }
        digits
    }

    fn read_operator(&mut self) -> Result<(), SyntaxError> {
        let line = self.line;
        let col = self.col;
        let ch = self.peek().unwrap_or(' ');

        let candidates: [(usize, &[&str]); 2] = [(3, &THREE_CHAR_OPS), (2, &TWO_CHAR_OPS)];
        for (len, ops) in candidates {
            let slice: String = self.input[self.pos..].iter().take(len).collect();
            if ops.contains(&slice.as_str()) {
                for _ in 0..len {
                    self.advance();
                }
                self.push(TokenKind::Op, slice, line, col);
                return Ok(());
            }
        }

        if !ONE_CHAR_OPS.contains(ch) {
            if ch.is_ascii() {
                return Err(SyntaxError::syntax(INVALID_SYNTAX, line, col));
            }
            return Err(invalid_character(ch, line, col));
        }

        match ch {
            '(' | '[' | '{' => self.brackets.push((ch, line, col)),
            ')' | ']' | '}' => match self.brackets.pop() {
                None => {
                    return Err(SyntaxError::syntax(format!("unmatched '{}'", ch), line, col));
                }
                Some((open, open_line, _)) if closing_for(open) != ch => {
                    let message = if open_line == line {
                        format!(
                            "closing parenthesis '{}' does not match opening parenthesis '{}'",
                            ch, open
                        )
                    } else {
                        format!(
                            "closing parenthesis '{}' does not match opening parenthesis '{}' on line {}",
                            ch, open, open_line
                        )
                    };
                    return Err(SyntaxError::syntax(message, line, col));
                }
                Some(_) => {}
            },
            _ => {}
        }

        self.advance();
        self.push(TokenKind::Op, ch.to_string(), line, col);
        Ok(())
    }

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\x0c')) {
            self.advance();
        }
    }

    fn skip_comment(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.advance();
        }
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>, line: usize, col: usize) {
        self.tokens.push(Token::new(kind, text, line, col));
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            if self.input[self.pos] == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.pos += 1;
        }
    }

    fn advance_char(&mut self) -> char {
        let ch = self.peek().unwrap_or_default();
        self.advance();
        ch
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }
}

fn overriding(error: SyntaxError) -> LexError {
    LexError {
        error,
        overrides_generic: true,
    }
}

fn invalid_character(ch: char, line: usize, col: usize) -> SyntaxError {
    SyntaxError::syntax(
        format!("invalid character '{}' (U+{:04X})", ch, ch as u32),
        line,
        col,
    )
}

fn closing_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}
