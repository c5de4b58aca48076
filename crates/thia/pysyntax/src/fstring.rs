//! Replacement fields of f-string literals
//!
//! The lexer keeps an f-string as one string token. This module walks the
//! literal the way CPython 3.11 does, hands every `{expression}` to a
//! callback for parsing, and reports the structural errors itself
//! (unbalanced braces, bad conversions, backslashes inside fields).

/// Deepest nesting of fields inside format specs
const MAX_FIELD_NESTING: usize = 2;

/// Deepest bracket nesting inside one field
const MAX_BRACKETS: usize = 200;

/// Why an f-string was rejected
#[derive(Debug, PartialEq)]
pub(crate) enum FieldError<E> {
    /// The literal itself is malformed
    Scan(String),
    /// The callback rejected an expression
    Expression(E),
}

/// Run `expression` over the source text of every replacement field in
/// the f-string token `token`, outermost first and in order.
pub(crate) fn check_fields<E>(
    token: &str,
    expression: impl FnMut(&str) -> Result<(), E>,
) -> Result<(), FieldError<E>> {
    let prefix_len = token.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    let raw = token[..prefix_len].to_ascii_lowercase().contains('r');
    let chars: Vec<char> = token.chars().skip(prefix_len).collect();

    let Some(&quote) = chars.first() else {
        return Ok(());
    };
    let triple = chars.len() >= 6 && chars[1] == quote && chars[2] == quote;
    let quote_len = if triple { 3 } else { 1 };
    if chars.len() < 2 * quote_len {
        return Ok(());
    }

    let mut scanner = Scanner {
        chars: &chars[quote_len..chars.len() - quote_len],
        pos: 0,
        raw,
        expression,
        _error: std::marker::PhantomData,
    };
    scanner.parse(0)
}

struct Scanner<'a, F, E> {
    chars: &'a [char],
    pos: usize,
    raw: bool,
    expression: F,
    _error: std::marker::PhantomData<E>,
}

impl<F, E> Scanner<'_, F, E>
where
    F: FnMut(&str) -> Result<(), E>,
{
    fn parse(&mut self, level: usize) -> Result<(), FieldError<E>> {
        loop {
            self.literal(level)?;
            match self.peek() {
                None | Some('}') => return Ok(()),
                Some(_) => self.field(level)?,
            }
        }
    }

    /// Skip literal text up to the next field, or the `}` closing a format spec
    fn literal(&mut self, level: usize) -> Result<(), FieldError<E>> {
        while let Some(mut ch) = self.next() {
            if !self.raw && ch == '\\' && self.peek().is_some() {
                ch = self.next().unwrap_or_default();
                if ch == 'N' {
                    // \N{NAME} braces are not fields
                    if self.next() == Some('{') {
                        while self.next().is_some_and(|c| c != '}') {}
                    }
                    continue;
                }
            }
            if ch != '{' && ch != '}' {
                continue;
            }
            if level == 0 {
                if self.peek() == Some(ch) {
                    self.pos += 1;
                    continue;
                }
                if ch == '}' {
                    return Err(scan_error("f-string: single '}' is not allowed"));
                }
            }
            self.pos -= 1;
            return Ok(());
        }
        Ok(())
    }

    fn field(&mut self, level: usize) -> Result<(), FieldError<E>> {
        if level >= MAX_FIELD_NESTING {
            return Err(scan_error("f-string: expressions nested too deeply"));
        }
        self.pos += 1;
        let start = self.pos;
        let mut quote: Option<(char, bool)> = None;
        let mut brackets: Vec<char> = Vec::new();

        while let Some(ch) = self.peek() {
            if ch == '\\' {
                return Err(scan_error(
                    "f-string expression part cannot include a backslash",
                ));
            }
            if let Some((open, triple)) = quote {
                if ch == open && (!triple || self.repeats(ch, 3)) {
                    self.pos += if triple { 3 } else { 1 };
                    quote = None;
                } else {
                    self.pos += 1;
                }
                continue;
            }
            match ch {
                '\'' | '"' => {
                    let triple = self.repeats(ch, 3);
                    self.pos += if triple { 3 } else { 1 };
                    quote = Some((ch, triple));
                    continue;
                }
                '[' | '{' | '(' => {
                    if brackets.len() >= MAX_BRACKETS {
                        return Err(scan_error("f-string: too many nested parenthesis"));
                    }
                    brackets.push(ch);
                }
                '#' => {
                    return Err(scan_error("f-string expression part cannot include '#'"));
                }
                '!' | ':' | '}' | '=' | '<' | '>' if brackets.is_empty() => {
                    if matches!(ch, '!' | '=' | '<' | '>') && self.peek_at(1) == Some('=') {
                        self.pos += 2;
                        continue;
                    }
                    if ch == '<' || ch == '>' {
                        self.pos += 1;
                        continue;
                    }
                    break;
                }
                ']' | '}' | ')' => {
                    let Some(open) = brackets.pop() else {
                        return Err(scan_error(format!("f-string: unmatched '{}'", ch)));
                    };
                    if !matches!((open, ch), ('(', ')') | ('[', ']') | ('{', '}')) {
                        return Err(scan_error(format!(
                            "f-string: closing parenthesis '{}' does not match opening parenthesis '{}'",
                            ch, open
                        )));
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }

        if quote.is_some() {
            return Err(scan_error("f-string: unterminated string"));
        }
        if let Some(open) = brackets.last() {
            return Err(scan_error(format!("f-string: unmatched '{}'", open)));
        }
        if self.peek().is_none() {
            return Err(expecting_brace());
        }

        let source: String = self.chars[start..self.pos].iter().collect();
        if source.chars().all(|c| matches!(c, ' ' | '\t' | '\n' | '\x0c')) {
            return Err(scan_error("f-string: empty expression not allowed"));
        }
        (self.expression)(&source).map_err(FieldError::Expression)?;

        if self.peek() == Some('=') {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
                self.pos += 1;
            }
        }
        if self.peek() == Some('!') {
            self.pos += 1;
            match self.next() {
                None => return Err(expecting_brace()),
                Some('s' | 'r' | 'a') => {}
                Some(_) => {
                    return Err(scan_error(
                        "f-string: invalid conversion character: expected 's', 'r', or 'a'",
                    ))
                }
            }
        }
        if self.peek() == Some(':') {
            self.pos += 1;
            if self.peek().is_none() {
                return Err(expecting_brace());
            }
            self.parse(level + 1)?;
        }
        if self.peek() != Some('}') {
            return Err(expecting_brace());
        }
        self.pos += 1;
        Ok(())
    }

    fn repeats(&self, ch: char, count: usize) -> bool {
        (0..count).all(|offset| self.peek_at(offset) == Some(ch))
    }

    fn next(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }
}

fn scan_error<E>(message: impl Into<String>) -> FieldError<E> {
    FieldError::Scan(message.into())
}

fn expecting_brace<E>() -> FieldError<E> {
    scan_error("f-string: expecting '}'")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(token: &str) -> Result<Vec<String>, FieldError<()>> {
        let mut seen = Vec::new();
        check_fields(token, |source| {
            seen.push(source.to_string());
            Ok::<(), ()>(())
        })?;
        Ok(seen)
    }

    fn scan_failure(token: &str) -> String {
        match fields(token) {
            Err(FieldError::Scan(message)) => message,
            other => panic!("expected {:?} to be rejected, got {:?}", token, other),
        }
    }

    #[test]
    fn test_fields_in_order() {
        assert_eq!(
            fields("f'{a} e {b!r:>{width}} {{literal}} {c=}'").unwrap(),
            vec!["a", "b", "width", "c"]
        );
        assert_eq!(fields("F\"\"\"{x\n + y}\"\"\"").unwrap(), vec!["x\n + y"]);
        assert_eq!(fields("rf'{a}\\d'").unwrap(), vec!["a"]);
    }

    #[test]
    fn test_operators_inside_fields() {
        assert_eq!(
            fields("f'{a != b} {a <= b} {a < b} {d[\"k\"]} {f(x, y)}'").unwrap(),
            vec!["a != b", "a <= b", "a < b", "d[\"k\"]", "f(x, y)"]
        );
        assert_eq!(fields("f'{\"}\"}'").unwrap(), vec!["\"}\""]);
    }

    #[test]
    fn test_named_escapes_are_not_fields() {
        assert_eq!(fields("f'\\N{BULLET} {x}'").unwrap(), vec!["x"]);
    }

    #[test]
    fn test_malformed_literals() {
        assert_eq!(scan_failure("f'a } b'"), "f-string: single '}' is not allowed");
        assert_eq!(scan_failure("f'{x'"), "f-string: expecting '}'");
        assert_eq!(scan_failure("f'{}'"), "f-string: empty expression not allowed");
        assert_eq!(
            scan_failure("f'{x!z}'"),
            "f-string: invalid conversion character: expected 's', 'r', or 'a'"
        );
        assert_eq!(
            scan_failure("f'{a\\n}'"),
            "f-string expression part cannot include a backslash"
        );
        assert_eq!(
            scan_failure("f'{a # b}'"),
            "f-string expression part cannot include '#'"
        );
        assert_eq!(scan_failure("f'{a)}'"), "f-string: unmatched ')'");
        assert_eq!(scan_failure("f'{a['"), "f-string: unmatched '['");
        assert_eq!(
            scan_failure("f'{a[}'"),
            "f-string: closing parenthesis '}' does not match opening parenthesis '['"
        );
        assert_eq!(
            scan_failure("f'{x:{y:{z}}}'"),
            "f-string: expressions nested too deeply"
        );
    }

    #[test]
    fn test_callback_errors_pass_through() {
        let result = check_fields("f'{ok} {bad}'", |source| match source {
            "bad" => Err(source.to_string()),
            _ => Ok(()),
        });
        assert_eq!(result, Err(FieldError::Expression("bad".to_string())));
    }
}
