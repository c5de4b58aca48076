//! Parser: recursive descent syntax checker for Python
//!
//! Consumes tokens from the lexer and checks them against the Python 3
//! grammar, including the checks CPython performs while compiling
//! (`return` outside a function, `break` outside a loop, invalid
//! assignment targets, late `global` declarations). Nothing is evaluated.
//! The only output besides the verdict is a small [`ParsedModule`] summary.

use std::collections::HashSet;

use crate::errors::{ParseFailure, ParseResult, SyntaxError, INVALID_SYNTAX};
use crate::fstring::{self, FieldError};
use crate::lexer::{is_keyword, LexError, Lexed, Lexer, Token, TokenKind};
use crate::symbols::{BlockKind, Declaration, Symbols};

/// Maximum nesting of expressions, unary operators, blocks and patterns
pub const MAX_NESTING: usize = 100;

const AUGMENTED_ASSIGN_OPS: [&str; 13] = [
    "+=", "-=", "*=", "/=", "//=", "%=", "@=", "&=", "|=", "^=", ">>=", "<<=", "**=",
];

const COMPARISON_OPS: [&str; 6] = ["==", "!=", "<", "<=", ">", ">="];

const BINARY_LEVELS: [&[&str]; 6] = [
    &["|"],
    &["^"],
    &["&"],
    &["<<", ">>"],
    &["+", "-"],
    &["*", "/", "//", "%", "@"],
];

/// What a successfully parsed program declares
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedModule {
    /// Number of statements, nested ones included
    pub statements: usize,
    /// Names of all functions defined, in source order
    pub functions: Vec<String>,
    /// Names of all classes defined, in source order
    pub classes: Vec<String>,
    /// Imported modules, relative ones with their leading dots
    pub imports: Vec<String>,
}

/// Shape of a parsed expression, kept only as far as target checks need it
#[derive(Clone, Debug, PartialEq)]
enum Expr {
    Name(Token),
    /// Attribute access, holding the attribute's token
    Attribute(Token),
    Subscript,
    Starred(Box<Expr>),
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    Call,
    /// Anything else, with the description used in diagnostics
    Other(&'static str),
}

impl Expr {
    fn describe(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Attribute(_) => "attribute",
            Self::Subscript => "subscript",
            Self::Starred(_) => "starred",
            Self::Tuple(_) => "tuple",
            Self::List(_) => "list",
            Self::Call => "function call",
            Self::Other(description) => *description,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TargetMode {
    Assign,
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScopeKind {
    Module,
    Class,
    Function { is_async: bool },
    Lambda,
}

impl ScopeKind {
    fn block(self) -> BlockKind {
        match self {
            Self::Module => BlockKind::Module,
            Self::Class => BlockKind::Class,
            Self::Function { .. } | Self::Lambda => BlockKind::Function,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Scope {
    kind: ScopeKind,
    loops: usize,
}

/// Compiler passes that run after parsing; an earlier pass reports first
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Pass {
    SymbolTable,
    /// Free names, once every symbol table is complete
    Resolution,
    Codegen,
}

#[derive(Clone, Debug)]
struct Deferred {
    pass: Pass,
    order: usize,
    error: SyntaxError,
}

/// What a pattern binds, and whether it matches any subject
#[derive(Clone, Debug, Default)]
struct PatternInfo {
    names: Vec<Token>,
    /// Bare capture or `_`, with the report order reserved where it was parsed
    irrefutable: Option<(Token, usize)>,
    /// The `*` of a star pattern
    star: Option<Token>,
}

/// Parser for Python source text
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    lex_error: Option<LexError>,
    depth: usize,
    scopes: Vec<Scope>,
    symbols: Symbols,
    /// First compile-time error; reported only if the whole text parses
    deferred: Option<Deferred>,
    /// Source order of deferred checks
    order: usize,
    module: ParsedModule,
}

impl Parser {
    /// Parse a complete module
    pub fn parse(source: &str) -> ParseResult<ParsedModule> {
        if source.contains('\0') {
            return Err(ParseFailure::NullByte);
        }

        let Lexed { tokens, error } = Lexer::new(source).tokenize();
        let mut parser = Self {
            tokens,
            pos: 0,
            lex_error: error,
            depth: 0,
            scopes: vec![Scope {
                kind: ScopeKind::Module,
                loops: 0,
            }],
            symbols: Symbols::new(),
            deferred: None,
            order: 0,
            module: ParsedModule::default(),
        };

        let result = match parser.parse_file() {
            Ok(()) => {
                if let Some(err) = parser.symbols.resolve() {
                    parser.defer_error(Pass::Resolution, 0, err);
                }
                match parser.deferred.take() {
                    Some(deferred) => Err(deferred.error.into()),
                    None => Ok(parser.module),
                }
            }
            Err(ParseFailure::Syntax(err)) => Err(parser.explain(err).into()),
            Err(other) => Err(other),
        };

        result.map_err(|failure| match failure {
            ParseFailure::Syntax(err) => ParseFailure::Syntax(err.with_source_line(source)),
            other => other,
        })
    }

    /// Prefer a tokenizer error from further down when it explains `err` better
    fn explain(&mut self, err: SyntaxError) -> SyntaxError {
        match self.lex_error.take() {
            Some(lex) if lex.overrides_generic && err.is_generic() => lex.error,
            // The bracket left open above the failure is the real problem
            Some(lex) if !lex.overrides_generic && err.line > lex.error.line => lex.error,
            _ => err,
        }
    }

    fn parse_file(&mut self) -> ParseResult<()> {
        while !self.check_kind(TokenKind::EndMarker) {
            self.parse_statement()?;
        }
        Ok(())
    }

    // ── Statements ───────────────────────────────────────────────────

    fn parse_statement(&mut self) -> ParseResult<()> {
        let tok = self.peek().clone();
        if tok.kind == TokenKind::Op && tok.text == "@" {
            return self.parse_decorated();
        }
        if tok.kind != TokenKind::Name {
            return self.parse_simple_statements();
        }

        match tok.text.as_str() {
            "def" => self.parse_function_def(false),
            "class" => self.parse_class_def(),
            "if" => self.parse_if(),
            "while" => self.parse_while(),
            "for" => self.parse_for(),
            "try" => self.parse_try(),
            "with" => self.parse_with(),
            "async" => self.parse_async(),
            "match" if self.looks_like_match()? => self.parse_match(),
            _ => self.parse_simple_statements(),
        }
    }

    fn parse_simple_statements(&mut self) -> ParseResult<()> {
        loop {
            self.parse_small_statement()?;
            if !self.eat_op(";") || self.check_kind(TokenKind::Newline) {
                break;
            }
        }
        self.expect_kind(TokenKind::Newline)
    }

    fn parse_small_statement(&mut self) -> ParseResult<()> {
        self.module.statements += 1;
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Name {
            return self.parse_expression_statement();
        }

        match tok.text.as_str() {
            "pass" => {
                self.advance();
            }
            "break" => {
                self.advance();
                if self.scope().loops == 0 {
                    self.defer(&tok, "'break' outside loop");
                }
            }
            "continue" => {
                self.advance();
                if self.scope().loops == 0 {
                    self.defer(&tok, "'continue' not properly in loop");
                }
            }
            "return" => {
                self.advance();
                if !matches!(self.scope().kind, ScopeKind::Function { .. }) {
                    self.defer(&tok, "'return' outside function");
                }
                if self.can_start_expression() {
                    let value_tok = self.peek().clone();
                    let value = self.parse_star_expressions()?;
                    self.check_value(&value, &value_tok);
                }
            }
            "raise" => {
                self.advance();
                if self.can_start_expression() {
                    self.parse_expression()?;
                    if self.eat_keyword("from") {
                        self.parse_expression()?;
                    }
                }
            }
            "global" | "nonlocal" => {
                self.advance();
                let declaration = if tok.text == "global" {
                    Declaration::Global
                } else {
                    Declaration::Nonlocal
                };
                loop {
                    let name = self.expect_name()?;
                    if let Err(err) = self.symbols.declare(&name, declaration, tok.line, tok.col) {
                        let order = self.next_order();
                        self.defer_error(Pass::SymbolTable, order, err);
                    }
                    if !self.eat_op(",") {
                        break;
                    }
                }
            }
            "del" => {
                self.advance();
                let target_tok = self.peek().clone();
                let targets = self.parse_star_expressions()?;
                self.check_target(&targets, &target_tok, TargetMode::Delete)?;
                self.store_target(&targets, TargetMode::Delete);
            }
            "assert" => {
                self.advance();
                self.parse_expression()?;
                if self.eat_op(",") {
                    self.parse_expression()?;
                }
            }
            "import" => self.parse_import()?,
            "from" => self.parse_from_import()?,
            _ => self.parse_expression_statement()?,
        }
        Ok(())
    }

    fn parse_expression_statement(&mut self) -> ParseResult<()> {
        let start = self.peek().clone();
        let first = self.parse_assignment_value()?;

        if self.check_op(":") {
            match &first {
                Expr::Name(_) | Expr::Attribute(_) | Expr::Subscript => {}
                Expr::Tuple(_) => {
                    return Err(fail_at(&start, "only single target (not tuple) can be annotated"))
                }
                Expr::List(_) => {
                    return Err(fail_at(&start, "only single target (not list) can be annotated"))
                }
                _ => return Err(fail_at(&start, "illegal target for annotation")),
            }
            self.advance();
            self.parse_expression()?;
            let has_value = self.eat_op("=");
            if has_value {
                self.parse_value()?;
            }
            match &first {
                Expr::Name(name) => {
                    if let Err(err) = self.symbols.annotate(&name.text, start.line, start.col) {
                        let order = self.next_order();
                        self.defer_error(Pass::SymbolTable, order, err);
                    }
                    self.forbid_debug(name, TargetMode::Assign);
                }
                other if has_value => self.store_target(other, TargetMode::Assign),
                _ => {}
            }
            return Ok(());
        }

        if AUGMENTED_ASSIGN_OPS.iter().any(|op| self.check_op(op)) {
            if !matches!(first, Expr::Name(_) | Expr::Attribute(_) | Expr::Subscript) {
                return Err(fail_at(
                    &start,
                    format!(
                        "'{}' is an illegal expression for augmented assignment",
                        first.describe()
                    ),
                ));
            }
            self.advance();
            self.parse_value()?;
            // Attributes are updated in place, without a store check
            if let Expr::Name(_) = first {
                self.store_target(&first, TargetMode::Assign);
            }
            return Ok(());
        }

        if self.check_op("=") {
            let mut targets = Vec::new();
            let mut target = first;
            let mut target_tok = start;
            while self.eat_op("=") {
                if let Expr::Starred(_) = target {
                    return Err(fail_at(
                        &target_tok,
                        "starred assignment target must be in a list or tuple",
                    ));
                }
                self.check_target(&target, &target_tok, TargetMode::Assign)?;
                targets.push(target);
                target_tok = self.peek().clone();
                target = self.parse_assignment_value()?;
            }
            self.check_value(&target, &target_tok);
            for target in &targets {
                self.store_target(target, TargetMode::Assign);
            }
            return Ok(());
        }

        if matches!(first, Expr::Name(_))
            && matches!(start.text.as_str(), "print" | "exec")
            && matches!(
                self.peek().kind,
                TokenKind::Name | TokenKind::Number | TokenKind::String
            )
        {
            return Err(fail_at(
                &start,
                format!(
                    "Missing parentheses in call to '{0}'. Did you mean {0}(...)?",
                    start.text
                ),
            ));
        }

        self.check_value(&first, &start);
        Ok(())
    }

    fn parse_assignment_value(&mut self) -> ParseResult<Expr> {
        if self.check_keyword("yield") {
            self.parse_yield_expr()
        } else {
            self.parse_star_expressions()
        }
    }

    /// A value that is stored or returned, so it may not be a bare `*x`
    fn parse_value(&mut self) -> ParseResult<Expr> {
        let tok = self.peek().clone();
        let value = self.parse_assignment_value()?;
        self.check_value(&value, &tok);
        Ok(value)
    }

    fn check_value(&mut self, value: &Expr, tok: &Token) {
        if let Expr::Starred(_) = value {
            self.defer(tok, "can't use starred expression here");
        }
    }

    fn parse_import(&mut self) -> ParseResult<()> {
        self.expect_keyword("import")?;
        loop {
            let first = self.peek().clone();
            let name = self.parse_dotted_name()?;
            let bound = if self.eat_keyword("as") {
                let alias = self.peek().clone();
                self.expect_name()?;
                alias
            } else {
                first
            };
            self.bind_import(&bound);
            self.module.imports.push(name);
            if !self.eat_op(",") {
                break;
            }
        }
        Ok(())
    }

    fn parse_from_import(&mut self) -> ParseResult<()> {
        self.expect_keyword("from")?;

        let mut module = String::new();
        loop {
            if self.eat_op(".") {
                module.push('.');
            } else if self.eat_op("...") {
                module.push_str("...");
            } else {
                break;
            }
        }
        if !self.check_keyword("import") {
            module.push_str(&self.parse_dotted_name()?);
        } else if module.is_empty() {
            return Err(self.invalid_syntax());
        }
        self.expect_keyword("import")?;

        if self.check_op("*") {
            let star = self.advance().clone();
            if self.scope().kind != ScopeKind::Module {
                let order = self.next_order();
                self.defer_at(Pass::SymbolTable, order, &star, "import * only allowed at module level");
            }
        } else if self.eat_op("(") {
            self.parse_import_names(true)?;
            self.expect_op(")")?;
        } else {
            self.parse_import_names(false)?;
        }

        self.module.imports.push(module);
        Ok(())
    }

    fn parse_import_names(&mut self, parenthesized: bool) -> ParseResult<()> {
        loop {
            let mut bound = self.peek().clone();
            self.expect_name()?;
            if self.eat_keyword("as") {
                bound = self.peek().clone();
                self.expect_name()?;
            }
            self.bind_import(&bound);
            if !self.check_op(",") {
                return Ok(());
            }
            let comma = self.advance().clone();
            if parenthesized && self.check_op(")") {
                return Ok(());
            }
            if !parenthesized && self.at_statement_end() {
                return Err(fail_at(
                    &comma,
                    "trailing comma not allowed without surrounding parentheses",
                ));
            }
        }
    }

    fn bind_import(&mut self, name: &Token) {
        self.symbols.bind_import(&name.text);
        self.forbid_debug(name, TargetMode::Assign);
    }

    fn parse_dotted_name(&mut self) -> ParseResult<String> {
        let mut name = self.expect_name()?;
        while self.eat_op(".") {
            name.push('.');
            name.push_str(&self.expect_name()?);
        }
        Ok(name)
    }

    // ── Compound statements ──────────────────────────────────────────

    fn parse_decorated(&mut self) -> ParseResult<()> {
        while self.eat_op("@") {
            self.parse_named_expression()?;
            self.expect_kind(TokenKind::Newline)?;
        }
        if self.check_keyword("def") {
            self.parse_function_def(false)
        } else if self.check_keyword("class") {
            self.parse_class_def()
        } else if self.check_keyword("async") && self.peek_keyword_at(1, "def") {
            self.advance();
            self.parse_function_def(true)
        } else {
            Err(self.invalid_syntax())
        }
    }

    fn parse_function_def(&mut self, is_async: bool) -> ParseResult<()> {
        self.module.statements += 1;
        let def_tok = self.peek().clone();
        self.expect_keyword("def")?;
        let name_tok = self.peek().clone();
        let name = self.expect_name()?;
        self.symbols.bind(&name);
        self.expect_op("(")?;
        let params = self.parse_parameters(false)?;
        self.expect_op(")")?;
        if self.eat_op("->") {
            self.parse_expression()?;
        }
        self.expect_colon()?;
        self.module.functions.push(name);
        self.with_scope(ScopeKind::Function { is_async }, |p| {
            p.bind_params(&params);
            p.parse_block("function definition", def_tok.line)
        })?;
        self.forbid_debug(&name_tok, TargetMode::Assign);
        Ok(())
    }

    fn parse_class_def(&mut self) -> ParseResult<()> {
        self.module.statements += 1;
        let class_tok = self.peek().clone();
        self.expect_keyword("class")?;
        let name_tok = self.peek().clone();
        let name = self.expect_name()?;
        self.symbols.bind(&name);
        if self.check_op("(") {
            self.parse_call_arguments()?;
        }
        self.expect_colon()?;
        self.module.classes.push(name);
        self.with_scope(ScopeKind::Class, |p| {
            p.parse_block("class definition", class_tok.line)
        })?;
        self.forbid_debug(&name_tok, TargetMode::Assign);
        Ok(())
    }

    fn parse_if(&mut self) -> ParseResult<()> {
        self.module.statements += 1;
        let if_tok = self.peek().clone();
        self.expect_keyword("if")?;
        self.parse_named_expression()?;
        self.expect_colon()?;
        self.parse_block("'if' statement", if_tok.line)?;

        while self.check_keyword("elif") {
            let elif_tok = self.advance().clone();
            self.parse_named_expression()?;
            self.expect_colon()?;
            self.parse_block("'elif' statement", elif_tok.line)?;
        }
        self.parse_else_clause()
    }

    fn parse_else_clause(&mut self) -> ParseResult<()> {
        if self.check_keyword("else") {
            let else_tok = self.advance().clone();
            self.expect_colon()?;
            self.parse_block("'else' statement", else_tok.line)?;
        }
        Ok(())
    }

    fn parse_while(&mut self) -> ParseResult<()> {
        self.module.statements += 1;
        let while_tok = self.peek().clone();
        self.expect_keyword("while")?;
        self.parse_named_expression()?;
        self.expect_colon()?;
        self.in_loop(|p| p.parse_block("'while' statement", while_tok.line))?;
        self.parse_else_clause()
    }

    fn parse_for(&mut self) -> ParseResult<()> {
        self.module.statements += 1;
        let for_tok = self.peek().clone();
        self.expect_keyword("for")?;
        let target_tok = self.peek().clone();
        let target = self.parse_target_list()?;
        self.check_target(&target, &target_tok, TargetMode::Assign)?;
        self.expect_keyword("in")?;
        let iter_tok = self.peek().clone();
        let iter = self.parse_star_expressions()?;
        self.check_value(&iter, &iter_tok);
        self.store_target(&target, TargetMode::Assign);
        self.expect_colon()?;
        self.in_loop(|p| p.parse_block("'for' statement", for_tok.line))?;
        self.parse_else_clause()
    }

    fn parse_try(&mut self) -> ParseResult<()> {
        self.module.statements += 1;
        let try_tok = self.peek().clone();
        self.expect_keyword("try")?;
        self.expect_colon()?;
        self.parse_block("'try' statement", try_tok.line)?;

        let mut handlers = 0;
        let mut bare_handler: Option<Token> = None;
        let mut star_kinds = HashSet::new();
        while self.check_keyword("except") {
            let except_tok = self.advance().clone();
            if let Some(bare) = &bare_handler {
                return Err(fail_at(bare, "default 'except:' must be last"));
            }
            let is_star = self.eat_op("*");
            star_kinds.insert(is_star);
            if star_kinds.len() > 1 {
                return Err(fail_at(
                    &except_tok,
                    "cannot have both 'except' and 'except*' on the same 'try'",
                ));
            }

            if self.check_op(":") {
                if is_star {
                    return Err(self.fail("expected one or more exception types"));
                }
                bare_handler = Some(except_tok.clone());
            } else {
                self.parse_expression()?;
                if self.check_op(",") {
                    return Err(self.fail("multiple exception types must be parenthesized"));
                }
                if self.eat_keyword("as") {
                    let name = self.peek().clone();
                    self.expect_name()?;
                    self.symbols.bind(&name.text);
                    self.forbid_debug(&name, TargetMode::Assign);
                }
            }
            self.expect_colon()?;
            self.parse_block("'except' statement", except_tok.line)?;
            handlers += 1;
        }

        if handlers > 0 {
            self.parse_else_clause()?;
        }

        if self.check_keyword("finally") {
            let finally_tok = self.advance().clone();
            self.expect_colon()?;
            self.parse_block("'finally' statement", finally_tok.line)?;
        } else if handlers == 0 {
            return Err(self.fail("expected 'except' or 'finally' block"));
        }
        Ok(())
    }

    fn parse_with(&mut self) -> ParseResult<()> {
        self.module.statements += 1;
        let with_tok = self.peek().clone();
        self.expect_keyword("with")?;

        if self.check_op("(") && self.parenthesized_with_items_ahead()? {
            self.advance();
            loop {
                self.parse_with_item()?;
                if !self.eat_op(",") || self.check_op(")") {
                    break;
                }
            }
            self.expect_op(")")?;
        } else {
            loop {
                self.parse_with_item()?;
                if !self.eat_op(",") {
                    break;
                }
            }
        }

        self.expect_colon()?;
        self.parse_block("'with' statement", with_tok.line)
    }

    fn parse_with_item(&mut self) -> ParseResult<()> {
        self.parse_expression()?;
        if self.eat_keyword("as") {
            let target_tok = self.peek().clone();
            let target = self.parse_target()?;
            self.check_target(&target, &target_tok, TargetMode::Assign)?;
            self.store_target(&target, TargetMode::Assign);
        }
        Ok(())
    }

    fn parenthesized_with_items_ahead(&mut self) -> ParseResult<bool> {
        self.speculate(|p| {
            p.expect_op("(")?;
            loop {
                p.parse_with_item()?;
                if !p.eat_op(",") || p.check_op(")") {
                    break;
                }
            }
            p.expect_op(")")?;
            Ok(p.check_op(":"))
        })
    }

    fn parse_async(&mut self) -> ParseResult<()> {
        let async_tok = self.peek().clone();
        self.expect_keyword("async")?;
        if self.check_keyword("def") {
            return self.parse_function_def(true);
        }

        let what = if self.check_keyword("for") {
            "for"
        } else if self.check_keyword("with") {
            "with"
        } else {
            return Err(self.invalid_syntax());
        };
        if !self.in_async_function() {
            self.defer(
                &async_tok,
                format!("'async {}' outside async function", what),
            );
        }
        if what == "for" {
            self.parse_for()
        } else {
            self.parse_with()
        }
    }

    fn looks_like_match(&mut self) -> ParseResult<bool> {
        self.speculate(|p| {
            p.advance();
            p.parse_subject()?;
            Ok(p.eat_op(":")
                && p.eat_kind(TokenKind::Newline)
                && p.eat_kind(TokenKind::Indent)
                && p.check_soft_keyword("case"))
        })
    }

    fn parse_match(&mut self) -> ParseResult<()> {
        self.module.statements += 1;
        let match_tok = self.advance().clone();
        self.parse_subject()?;
        self.expect_colon()?;
        self.expect_kind(TokenKind::Newline)?;
        if !self.eat_kind(TokenKind::Indent) {
            return Err(self.expected_block("'match' statement", match_tok.line));
        }

        self.nested(|p| {
            // Pattern of the previous case, when it has no guard
            let mut unguarded: Option<PatternInfo> = None;
            while p.check_soft_keyword("case") {
                if let Some((tok, order)) = unguarded.take().and_then(|info| info.irrefutable) {
                    p.defer_unreachable(&tok, order);
                }
                let case_tok = p.advance().clone();
                let pattern = p.parse_open_patterns()?;
                if p.eat_keyword("if") {
                    p.parse_named_expression()?;
                } else {
                    unguarded = Some(pattern);
                }
                p.expect_colon()?;
                p.parse_block("'case' statement", case_tok.line)?;
            }
            p.expect_kind(TokenKind::Dedent)
        })
    }

    fn parse_subject(&mut self) -> ParseResult<()> {
        self.parse_star_named_expression()?;
        while self.eat_op(",") {
            if !self.can_start_expression() {
                break;
            }
            self.parse_star_named_expression()?;
        }
        Ok(())
    }

    fn parse_block(&mut self, what: &str, line: usize) -> ParseResult<()> {
        self.nested(|p| {
            if !p.eat_kind(TokenKind::Newline) {
                return p.parse_simple_statements();
            }
            if !p.eat_kind(TokenKind::Indent) {
                return Err(p.expected_block(what, line));
            }
            while !p.check_kind(TokenKind::Dedent) && !p.check_kind(TokenKind::EndMarker) {
                p.parse_statement()?;
            }
            p.expect_kind(TokenKind::Dedent)
        })
    }

    fn expected_block(&self, what: &str, line: usize) -> ParseFailure {
        let tok = self.peek();
        if tok.kind == TokenKind::Error {
            return self.lex_failure();
        }
        SyntaxError::indentation(
            format!("expected an indented block after {} on line {}", what, line),
            tok.line,
            tok.col,
        )
        .into()
    }

    // ── Patterns ─────────────────────────────────────────────────────

    fn parse_open_patterns(&mut self) -> ParseResult<PatternInfo> {
        let order = self.next_order();
        let first = self.parse_pattern()?;
        if !self.check_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.check_op(":") || self.check_keyword("if") {
                break;
            }
            items.push(self.parse_pattern()?);
        }
        Ok(self.join_items(items, order))
    }

    fn parse_pattern(&mut self) -> ParseResult<PatternInfo> {
        self.nested(|p| {
            if p.check_op("*") {
                let star = p.advance().clone();
                let name = p.peek().clone();
                p.expect_name()?;
                let mut info = PatternInfo {
                    star: Some(star),
                    ..PatternInfo::default()
                };
                if name.text != "_" {
                    p.capture(&name);
                    info.names.push(name);
                }
                return Ok(info);
            }

            let first = p.peek().clone();
            let mut alternatives = vec![p.parse_closed_pattern()?];
            while p.eat_op("|") {
                if let Some((tok, order)) = alternatives.last().and_then(|a| a.irrefutable.clone()) {
                    p.defer_unreachable(&tok, order);
                }
                alternatives.push(p.parse_closed_pattern()?);
            }
            let mut info = p.join_alternatives(&first, alternatives);

            if p.eat_keyword("as") {
                let name = p.peek().clone();
                p.expect_name()?;
                if name.text == "_" {
                    return Err(fail_at(&name, "cannot use '_' as a target"));
                }
                p.capture(&name);
                p.merge_names(&mut info.names, vec![name]);
                info.irrefutable = None;
            }
            Ok(info)
        })
    }

    fn parse_closed_pattern(&mut self) -> ParseResult<PatternInfo> {
        let tok = self.peek().clone();
        match (tok.kind, tok.text.as_str()) {
            (TokenKind::Number, _) => {
                self.advance();
                self.parse_complex_tail()?;
                Ok(PatternInfo::default())
            }
            (TokenKind::String, _) => {
                self.parse_strings()?;
                Ok(PatternInfo::default())
            }
            (TokenKind::Name, "None" | "True" | "False") => {
                self.advance();
                Ok(PatternInfo::default())
            }
            (TokenKind::Name, name) if !is_keyword(name) => {
                let order = self.next_order();
                self.advance();
                if !self.check_op(".") && !self.check_op("(") {
                    let mut info = PatternInfo::default();
                    if tok.text != "_" {
                        self.capture(&tok);
                        info.names.push(tok.clone());
                    }
                    info.irrefutable = Some((tok.clone(), order));
                    return Ok(info);
                }
                while self.eat_op(".") {
                    self.expect_name()?;
                }
                if self.check_op("(") {
                    return self.parse_class_pattern_arguments();
                }
                Ok(PatternInfo::default())
            }
            (TokenKind::Op, "-") => {
                self.advance();
                self.expect_kind(TokenKind::Number)?;
                self.parse_complex_tail()?;
                Ok(PatternInfo::default())
            }
            (TokenKind::Op, "(") => self.parse_sequence_pattern(")"),
            (TokenKind::Op, "[") => self.parse_sequence_pattern("]"),
            (TokenKind::Op, "{") => self.parse_mapping_pattern(),
            _ => Err(self.invalid_syntax()),
        }
    }

    fn parse_complex_tail(&mut self) -> ParseResult<()> {
        if (self.check_op("+") || self.check_op("-"))
            && self.peek_at(1).kind == TokenKind::Number
        {
            self.advance();
            self.advance();
        }
        Ok(())
    }

    fn parse_sequence_pattern(&mut self, close: &str) -> ParseResult<PatternInfo> {
        let order = self.next_order();
        self.advance();
        let mut items = Vec::new();
        let mut trailing_comma = false;
        while !self.check_op(close) {
            items.push(self.parse_pattern()?);
            trailing_comma = self.eat_op(",");
            if !trailing_comma {
                break;
            }
        }
        self.expect_op(close)?;

        // `(p)` is a group, not a sequence
        if close == ")" && items.len() == 1 && !trailing_comma && items[0].star.is_none() {
            return Ok(items.pop().unwrap_or_default());
        }
        Ok(self.join_items(items, order))
    }

    fn parse_mapping_pattern(&mut self) -> ParseResult<PatternInfo> {
        self.expect_op("{")?;
        let mut info = PatternInfo::default();
        while !self.check_op("}") {
            if self.eat_op("**") {
                let rest = self.peek().clone();
                self.expect_name()?;
                self.capture(&rest);
                self.merge_names(&mut info.names, vec![rest]);
            } else {
                self.parse_closed_pattern()?;
                self.expect_colon()?;
                let value = self.parse_pattern()?;
                self.merge_names(&mut info.names, value.names);
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op("}")?;
        Ok(info)
    }

    fn parse_class_pattern_arguments(&mut self) -> ParseResult<PatternInfo> {
        self.expect_op("(")?;
        let mut info = PatternInfo::default();
        let mut attributes: Vec<Token> = Vec::new();
        while !self.check_op(")") {
            if self.peek().kind == TokenKind::Name && self.peek_op_at(1, "=") {
                let attribute = self.advance().clone();
                self.advance();
                if attributes.iter().any(|seen| seen.text == attribute.text) {
                    self.defer(
                        &attribute,
                        format!("attribute name repeated in class pattern: {}", attribute.text),
                    );
                }
                attributes.push(attribute);
            }
            let argument = self.parse_pattern()?;
            self.merge_names(&mut info.names, argument.names);
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        Ok(info)
    }

    /// A name bound by a pattern
    fn capture(&mut self, name: &Token) {
        self.symbols.bind(&name.text);
        self.forbid_debug(name, TargetMode::Assign);
    }

    fn join_items(&mut self, items: Vec<PatternInfo>, order: usize) -> PatternInfo {
        let mut joined = PatternInfo::default();
        let mut starred = false;
        for item in items {
            if let Some(star) = &item.star {
                if starred {
                    self.defer_at(
                        Pass::Codegen,
                        order,
                        star,
                        "multiple starred names in sequence pattern",
                    );
                }
                starred = true;
            }
            self.merge_names(&mut joined.names, item.names);
        }
        joined
    }

    /// Alternatives of an or-pattern must bind the same names
    fn join_alternatives(&mut self, first: &Token, mut alternatives: Vec<PatternInfo>) -> PatternInfo {
        let Some(last) = alternatives.pop() else {
            return PatternInfo::default();
        };
        if alternatives.is_empty() {
            return last;
        }
        let names = alternatives.remove(0).names;
        let differs = alternatives.iter().chain([&last]).any(|alternative| {
            alternative.names.len() != names.len()
                || alternative
                    .names
                    .iter()
                    .any(|name| !names.iter().any(|seen| seen.text == name.text))
        });
        if differs {
            self.defer(first, "alternative patterns bind different names");
        }
        PatternInfo {
            names,
            irrefutable: last.irrefutable,
            star: None,
        }
    }

    fn merge_names(&mut self, names: &mut Vec<Token>, more: Vec<Token>) {
        for name in more {
            if names.iter().any(|seen| seen.text == name.text) {
                self.defer(
                    &name,
                    format!("multiple assignments to name '{}' in pattern", name.text),
                );
            } else {
                names.push(name);
            }
        }
    }

    fn defer_unreachable(&mut self, tok: &Token, order: usize) {
        let message = if tok.text == "_" {
            "wildcard makes remaining patterns unreachable".to_string()
        } else {
            format!("name capture '{}' makes remaining patterns unreachable", tok.text)
        };
        self.defer_at(Pass::Codegen, order, tok, message);
    }

    // ── Targets ──────────────────────────────────────────────────────

    fn parse_target_list(&mut self) -> ParseResult<Expr> {
        let first = self.parse_target()?;
        if !self.check_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if !self.can_start_expression() {
                break;
            }
            items.push(self.parse_target()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn parse_target(&mut self) -> ParseResult<Expr> {
        self.nested(|p| {
            if p.eat_op("*") {
                return Ok(Expr::Starred(Box::new(p.parse_target()?)));
            }
            p.parse_primary()
        })
    }

    fn check_target(&self, target: &Expr, tok: &Token, mode: TargetMode) -> ParseResult<()> {
        match invalid_target(target, mode) {
            Some(message) => Err(fail_at(tok, message)),
            None => Ok(()),
        }
    }

    /// Record the names a checked target binds
    fn store_target(&mut self, target: &Expr, mode: TargetMode) {
        match target {
            Expr::Name(name) => {
                self.symbols.store(&name.text);
                self.forbid_debug(name, mode);
            }
            Expr::Attribute(attribute) => self.forbid_debug(attribute, mode),
            Expr::Starred(inner) => self.store_target(inner, mode),
            Expr::Tuple(items) | Expr::List(items) => {
                for item in items {
                    self.store_target(item, mode);
                }
            }
            _ => {}
        }
    }

    fn forbid_debug(&mut self, name: &Token, mode: TargetMode) {
        if name.text != "__debug__" {
            return;
        }
        let message = match mode {
            TargetMode::Assign => "cannot assign to __debug__",
            TargetMode::Delete => "cannot delete __debug__",
        };
        self.defer(name, message);
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn parse_star_expressions(&mut self) -> ParseResult<Expr> {
        let first = self.parse_star_expression()?;
        if !self.check_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if !self.can_start_expression() {
                break;
            }
            items.push(self.parse_star_expression()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn parse_star_expression(&mut self) -> ParseResult<Expr> {
        if self.eat_op("*") {
            return Ok(Expr::Starred(Box::new(self.parse_bitwise_or()?)));
        }
        self.parse_expression()
    }

    fn parse_star_named_expression(&mut self) -> ParseResult<Expr> {
        if self.eat_op("*") {
            return Ok(Expr::Starred(Box::new(self.parse_bitwise_or()?)));
        }
        self.parse_named_expression()
    }

    fn parse_named_expression(&mut self) -> ParseResult<Expr> {
        let start = self.peek().clone();
        if start.kind == TokenKind::Name && !is_keyword(&start.text) && self.peek_op_at(1, ":=") {
            self.advance();
            self.advance();
            self.parse_expression()?;
            self.symbols.bind_named(&start.text);
            self.forbid_debug(&start, TargetMode::Assign);
            return Ok(Expr::Other("named expression"));
        }

        let expr = self.parse_expression()?;
        if self.check_op(":=") {
            return Err(fail_at(
                &start,
                format!("cannot use assignment expressions with {}", expr.describe()),
            ));
        }
        Ok(expr)
    }

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.nested(|p| {
            if p.check_keyword("lambda") {
                return p.parse_lambda();
            }
            let expr = p.parse_disjunction()?;
            if !p.eat_keyword("if") {
                return Ok(expr);
            }
            p.parse_disjunction()?;
            if !p.eat_keyword("else") {
                return Err(p.fail("expected 'else' after 'if' expression"));
            }
            p.parse_expression()?;
            Ok(Expr::Other("conditional expression"))
        })
    }

    fn parse_lambda(&mut self) -> ParseResult<Expr> {
        self.expect_keyword("lambda")?;
        let params = self.parse_parameters(true)?;
        self.expect_colon()?;
        self.with_scope(ScopeKind::Lambda, |p| {
            p.bind_params(&params);
            p.parse_expression()
        })?;
        Ok(Expr::Other("lambda"))
    }

    fn parse_disjunction(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_conjunction()?;
        while self.eat_keyword("or") {
            self.parse_conjunction()?;
            expr = Expr::Other("expression");
        }
        Ok(expr)
    }

    fn parse_conjunction(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_inversion()?;
        while self.eat_keyword("and") {
            self.parse_inversion()?;
            expr = Expr::Other("expression");
        }
        Ok(expr)
    }

    fn parse_inversion(&mut self) -> ParseResult<Expr> {
        if self.eat_keyword("not") {
            self.nested(|p| p.parse_inversion())?;
            return Ok(Expr::Other("expression"));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_bitwise_or()?;
        loop {
            if COMPARISON_OPS.iter().any(|op| self.check_op(op)) || self.check_keyword("in") {
                self.advance();
            } else if self.check_keyword("not") && self.peek_keyword_at(1, "in") {
                self.advance();
                self.advance();
            } else if self.check_keyword("is") {
                self.advance();
                self.eat_keyword("not");
            } else {
                return Ok(expr);
            }
            self.parse_bitwise_or()?;
            expr = Expr::Other("comparison");
        }
    }

    fn parse_bitwise_or(&mut self) -> ParseResult<Expr> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, level: usize) -> ParseResult<Expr> {
        let Some(ops) = BINARY_LEVELS.get(level) else {
            return self.parse_factor();
        };
        let mut expr = self.parse_binary(level + 1)?;
        while ops.iter().any(|op| self.check_op(op)) {
            self.advance();
            self.parse_binary(level + 1)?;
            expr = Expr::Other("expression");
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> ParseResult<Expr> {
        if self.check_op("+") || self.check_op("-") || self.check_op("~") {
            self.advance();
            self.nested(|p| p.parse_factor())?;
            return Ok(Expr::Other("expression"));
        }
        let base = self.parse_await_primary()?;
        if self.eat_op("**") {
            self.nested(|p| p.parse_factor())?;
            return Ok(Expr::Other("expression"));
        }
        Ok(base)
    }

    fn parse_await_primary(&mut self) -> ParseResult<Expr> {
        if !self.check_keyword("await") {
            return self.parse_primary();
        }
        let await_tok = self.advance().clone();
        match self.scope().kind {
            ScopeKind::Function { is_async: true } => {}
            ScopeKind::Function { .. } | ScopeKind::Lambda => {
                self.defer(&await_tok, "'await' outside async function")
            }
            ScopeKind::Module | ScopeKind::Class => {
                self.defer(&await_tok, "'await' outside function")
            }
        }
        self.parse_primary()?;
        Ok(Expr::Other("await expression"))
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat_op(".") {
                let attribute = self.peek().clone();
                self.expect_name()?;
                expr = Expr::Attribute(attribute);
            } else if self.check_op("(") {
                self.parse_call_arguments()?;
                expr = Expr::Call;
            } else if self.check_op("[") {
                self.parse_subscript()?;
                expr = Expr::Subscript;
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_atom(&mut self) -> ParseResult<Expr> {
        let tok = self.peek().clone();
        match (tok.kind, tok.text.as_str()) {
            (TokenKind::Name, "True") => self.literal_keyword("True"),
            (TokenKind::Name, "False") => self.literal_keyword("False"),
            (TokenKind::Name, "None") => self.literal_keyword("None"),
            (TokenKind::Name, name) if is_keyword(name) => Err(self.invalid_syntax()),
            (TokenKind::Name, _) => {
                self.advance();
                self.symbols.load(&tok.text);
                Ok(Expr::Name(tok.clone()))
            }
            (TokenKind::Number, _) => {
                self.advance();
                Ok(Expr::Other("literal"))
            }
            (TokenKind::String, _) => self.parse_strings(),
            (TokenKind::Op, "(") => self.parse_group(),
            (TokenKind::Op, "[") => self.parse_list(),
            (TokenKind::Op, "{") => self.parse_dict_or_set(),
            (TokenKind::Op, "...") => {
                self.advance();
                Ok(Expr::Other("ellipsis"))
            }
            _ => Err(self.invalid_syntax()),
        }
    }

    fn literal_keyword(&mut self, name: &'static str) -> ParseResult<Expr> {
        self.advance();
        Ok(Expr::Other(name))
    }

    fn parse_strings(&mut self) -> ParseResult<Expr> {
        let mut bytes_seen: Option<bool> = None;
        let mut formatted = false;
        while self.check_kind(TokenKind::String) {
            let tok = self.advance().clone();
            let prefix: String = tok
                .text
                .chars()
                .take_while(|c| c.is_ascii_alphabetic())
                .collect::<String>()
                .to_ascii_lowercase();
            let is_bytes = prefix.contains('b');
            if bytes_seen.is_some_and(|seen| seen != is_bytes) {
                return Err(fail_at(&tok, "cannot mix bytes and nonbytes literals"));
            }
            bytes_seen = Some(is_bytes);
            if prefix.contains('f') {
                self.check_fstring(&tok)?;
                formatted = true;
            }
        }
        Ok(Expr::Other(if formatted {
            "f-string expression"
        } else {
            "literal"
        }))
    }

    fn parse_group(&mut self) -> ParseResult<Expr> {
        self.expect_op("(")?;
        if self.eat_op(")") {
            return Ok(Expr::Tuple(Vec::new()));
        }
        if self.check_keyword("yield") {
            self.parse_yield_expr()?;
            self.expect_op(")")?;
            return Ok(Expr::Other("yield expression"));
        }

        let first_tok = self.peek().clone();
        let mark = self.symbols.mark();
        let first = self.parse_star_named_expression()?;
        if self.at_comprehension() {
            self.parse_comprehension_clauses(mark)?;
            self.expect_op(")")?;
            return Ok(Expr::Other("generator expression"));
        }
        if !self.check_op(",") {
            if let Expr::Starred(_) = first {
                if self.check_op(")") {
                    return Err(fail_at(&first_tok, "cannot use starred expression here"));
                }
            }
            self.expect_op(")")?;
            return Ok(first);
        }

        let items = self.parse_display_items(first, ")")?;
        self.expect_op(")")?;
        Ok(Expr::Tuple(items))
    }

    fn parse_list(&mut self) -> ParseResult<Expr> {
        self.expect_op("[")?;
        if self.eat_op("]") {
            return Ok(Expr::List(Vec::new()));
        }
        let mark = self.symbols.mark();
        let first = self.parse_star_named_expression()?;
        if self.at_comprehension() {
            self.parse_comprehension_clauses(mark)?;
            self.expect_op("]")?;
            return Ok(Expr::Other("list comprehension"));
        }
        let items = self.parse_display_items(first, "]")?;
        self.expect_op("]")?;
        Ok(Expr::List(items))
    }

    fn parse_display_items(&mut self, first: Expr, close: &str) -> ParseResult<Vec<Expr>> {
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.check_op(close) {
                break;
            }
            items.push(self.parse_star_named_expression()?);
        }
        Ok(items)
    }

    fn parse_dict_or_set(&mut self) -> ParseResult<Expr> {
        self.expect_op("{")?;
        if self.eat_op("}") {
            return Ok(Expr::Other("dict literal"));
        }

        if self.eat_op("**") {
            self.parse_bitwise_or()?;
            return self.parse_dict_rest();
        }

        let mark = self.symbols.mark();
        let first = self.parse_star_named_expression()?;
        if self.eat_op(":") {
            if let Expr::Starred(_) = first {
                return Err(self.invalid_syntax());
            }
            self.parse_expression()?;
            if self.at_comprehension() {
                self.parse_comprehension_clauses(mark)?;
                self.expect_op("}")?;
                return Ok(Expr::Other("dict comprehension"));
            }
            return self.parse_dict_rest();
        }

        if self.at_comprehension() {
            self.parse_comprehension_clauses(mark)?;
            self.expect_op("}")?;
            return Ok(Expr::Other("set comprehension"));
        }
        self.parse_display_items(first, "}")?;
        self.expect_op("}")?;
        Ok(Expr::Other("set display"))
    }

    fn parse_dict_rest(&mut self) -> ParseResult<Expr> {
        while self.eat_op(",") {
            if self.check_op("}") {
                break;
            }
            if self.eat_op("**") {
                self.parse_bitwise_or()?;
            } else {
                self.parse_expression()?;
                self.expect_colon()?;
                self.parse_expression()?;
            }
        }
        self.expect_op("}")?;
        Ok(Expr::Other("dict literal"))
    }

    fn at_comprehension(&self) -> bool {
        self.check_keyword("for") || (self.check_keyword("async") && self.peek_keyword_at(1, "for"))
    }

    /// Clauses of a comprehension whose element was parsed from `mark` on
    fn parse_comprehension_clauses(&mut self, mark: usize) -> ParseResult<()> {
        self.symbols.enter_comprehension(mark);
        let result = self.parse_comprehension_body();
        self.symbols.leave();
        result
    }

    fn parse_comprehension_body(&mut self) -> ParseResult<()> {
        let mut outermost = true;
        while self.at_comprehension() {
            self.eat_keyword("async");
            self.expect_keyword("for")?;
            let target_tok = self.peek().clone();
            let target = self.parse_target_list()?;
            self.check_target(&target, &target_tok, TargetMode::Assign)?;
            self.expect_keyword("in")?;
            if outermost {
                // The first iterable is evaluated in the enclosing block
                let table = self.symbols.step_out();
                let iter = self.parse_disjunction();
                self.symbols.reopen(table);
                iter?;
                outermost = false;
            } else {
                self.parse_disjunction()?;
            }
            self.store_target(&target, TargetMode::Assign);
            while self.eat_keyword("if") {
                self.parse_disjunction()?;
            }
        }
        Ok(())
    }

    fn parse_yield_expr(&mut self) -> ParseResult<Expr> {
        let yield_tok = self.peek().clone();
        self.expect_keyword("yield")?;
        if !matches!(
            self.scope().kind,
            ScopeKind::Function { .. } | ScopeKind::Lambda
        ) {
            self.defer(&yield_tok, "'yield' outside function");
        }
        if self.eat_keyword("from") {
            if self.in_async_function() {
                self.defer(&yield_tok, "'yield from' inside async function");
            }
            self.parse_expression()?;
        } else if self.can_start_expression() {
            let value_tok = self.peek().clone();
            let value = self.parse_star_expressions()?;
            self.check_value(&value, &value_tok);
        }
        Ok(Expr::Other("yield expression"))
    }

    fn parse_call_arguments(&mut self) -> ParseResult<()> {
        self.expect_op("(")?;
        let order = self.next_order();
        let mut keywords: Vec<Token> = Vec::new();
        let mut count = 0;
        let mut bare_generator = false;
        let mut seen_keyword = false;
        let mut seen_double_star = false;

        while !self.check_op(")") {
            let tok = self.peek().clone();
            if self.eat_op("*") {
                if seen_double_star {
                    return Err(fail_at(
                        &tok,
                        "iterable argument unpacking follows keyword argument unpacking",
                    ));
                }
                self.parse_expression()?;
            } else if self.eat_op("**") {
                self.parse_expression()?;
                seen_double_star = true;
            } else if tok.kind == TokenKind::Name
                && !is_keyword(&tok.text)
                && self.peek_op_at(1, "=")
            {
                keywords.push(tok.clone());
                self.advance();
                self.advance();
                self.parse_expression()?;
                seen_keyword = true;
            } else {
                let mark = self.symbols.mark();
                self.parse_named_expression()?;
                if self.check_op("=") {
                    return Err(fail_at(
                        &tok,
                        "expression cannot contain assignment, perhaps you meant \"==\"?",
                    ));
                }
                if self.at_comprehension() {
                    self.parse_comprehension_clauses(mark)?;
                    bare_generator = true;
                }
                if seen_double_star {
                    return Err(fail_at(
                        &tok,
                        "positional argument follows keyword argument unpacking",
                    ));
                }
                if seen_keyword {
                    return Err(fail_at(&tok, "positional argument follows keyword argument"));
                }
            }

            count += 1;
            if !self.eat_op(",") {
                break;
            }
        }

        if bare_generator && count > 1 {
            return Err(self.fail("Generator expression must be parenthesized"));
        }
        self.expect_op(")")?;
        self.check_keywords(&keywords, order);
        Ok(())
    }

    fn check_keywords(&mut self, keywords: &[Token], order: usize) {
        for (index, keyword) in keywords.iter().enumerate() {
            if keyword.text == "__debug__" {
                self.defer_at(Pass::Codegen, order, keyword, "cannot assign to __debug__");
                return;
            }
            if let Some(repeated) = keywords[index + 1..].iter().find(|k| k.text == keyword.text) {
                let message = format!("keyword argument repeated: {}", keyword.text);
                self.defer_at(Pass::Codegen, order, repeated, message);
                return;
            }
        }
    }

    fn parse_subscript(&mut self) -> ParseResult<()> {
        self.expect_op("[")?;
        loop {
            self.parse_slice()?;
            if !self.eat_op(",") || self.check_op("]") {
                break;
            }
        }
        self.expect_op("]")
    }

    fn parse_slice(&mut self) -> ParseResult<()> {
        if self.eat_op("*") {
            self.parse_bitwise_or()?;
            return Ok(());
        }
        if !self.check_op(":") {
            self.parse_named_expression()?;
            if !self.check_op(":") {
                return Ok(());
            }
        }
        self.advance();
        if self.can_start_expression() {
            self.parse_expression()?;
        }
        if self.eat_op(":") && self.can_start_expression() {
            self.parse_expression()?;
        }
        Ok(())
    }

    /// Parse a parameter list, returning the parameter names
    fn parse_parameters(&mut self, lambda: bool) -> ParseResult<Vec<Token>> {
        let close = if lambda { ":" } else { ")" };
        let mut names = Vec::new();
        let mut positional = 0;
        let mut seen_default = false;
        let mut seen_slash = false;
        let mut star: Option<Token> = None;
        let mut bare_star_pending = false;
        let mut seen_kwargs = false;

        while !self.check_op(close) {
            let tok = self.peek().clone();
            if seen_kwargs {
                return Err(fail_at(&tok, "arguments cannot follow var-keyword argument"));
            }

            if self.eat_op("/") {
                if seen_slash {
                    return Err(fail_at(&tok, "/ may appear only once"));
                }
                if star.is_some() {
                    return Err(fail_at(&tok, "/ must be ahead of *"));
                }
                if positional == 0 {
                    return Err(fail_at(&tok, "at least one argument must precede /"));
                }
                seen_slash = true;
            } else if self.eat_op("*") {
                if star.is_some() {
                    return Err(fail_at(&tok, "* argument may appear only once"));
                }
                star = Some(tok);
                if self.check_op(",") || self.check_op(close) {
                    bare_star_pending = true;
                } else {
                    self.parse_parameter_name(&mut names, !lambda)?;
                }
            } else if self.eat_op("**") {
                if bare_star_pending {
                    if let Some(star_tok) = &star {
                        return Err(fail_at(star_tok, "named arguments must follow bare *"));
                    }
                }
                self.parse_parameter_name(&mut names, !lambda)?;
                seen_kwargs = true;
            } else {
                self.parse_parameter_name(&mut names, !lambda)?;
                if self.eat_op("=") {
                    self.parse_expression()?;
                    if star.is_none() {
                        seen_default = true;
                    }
                } else if seen_default && star.is_none() {
                    return Err(fail_at(&tok, "non-default argument follows default argument"));
                }
                if star.is_none() {
                    positional += 1;
                }
                bare_star_pending = false;
            }

            if !self.eat_op(",") {
                break;
            }
        }

        if bare_star_pending {
            if let Some(star_tok) = &star {
                return Err(fail_at(star_tok, "named arguments must follow bare *"));
            }
        }
        Ok(names)
    }

    fn parse_parameter_name(
        &mut self,
        names: &mut Vec<Token>,
        allow_annotation: bool,
    ) -> ParseResult<()> {
        let tok = self.peek().clone();
        let name = self.expect_name()?;
        if names.iter().any(|seen| seen.text == name) {
            let order = self.next_order();
            self.defer_at(
                Pass::SymbolTable,
                order,
                &tok,
                format!("duplicate argument '{}' in function definition", name),
            );
        }
        self.forbid_debug(&tok, TargetMode::Assign);
        names.push(tok);
        if allow_annotation && self.eat_op(":") {
            self.parse_expression()?;
        }
        Ok(())
    }

    fn bind_params(&mut self, params: &[Token]) {
        for param in params {
            self.symbols.bind_param(&param.text);
        }
    }

    // ── F-strings ────────────────────────────────────────────────────

    fn check_fstring(&mut self, tok: &Token) -> ParseResult<()> {
        match fstring::check_fields(&tok.text, |source| self.parse_fstring_field(source, tok)) {
            Ok(()) => Ok(()),
            Err(FieldError::Scan(message)) => Err(fail_at(tok, message)),
            Err(FieldError::Expression(failure)) => Err(failure),
        }
    }

    /// Parse one replacement field as a parenthesized expression, with
    /// locations pointing at the string token
    fn parse_fstring_field(&mut self, source: &str, tok: &Token) -> ParseResult<()> {
        let Lexed { mut tokens, error } = Lexer::new(&format!("({})", source)).tokenize();
        for field_tok in &mut tokens {
            field_tok.line += tok.line - 1;
            field_tok.col = tok.col;
        }
        if let Some(lex) = error {
            return Err(fail_at(tok, format!("f-string: {}", lex.error.message)));
        }

        let saved_tokens = std::mem::replace(&mut self.tokens, tokens);
        let saved_pos = std::mem::replace(&mut self.pos, 0);
        let saved_lex_error = self.lex_error.take();
        let result = self.parse_star_expressions().and_then(|_| {
            if self.eat_kind(TokenKind::Newline) || self.check_kind(TokenKind::EndMarker) {
                Ok(())
            } else {
                Err(self.invalid_syntax())
            }
        });
        self.tokens = saved_tokens;
        self.pos = saved_pos;
        self.lex_error = saved_lex_error;

        match result {
            Err(ParseFailure::Syntax(mut err)) => {
                if !err.message.starts_with("f-string") {
                    err.message = format!("f-string: {}", err.message);
                }
                Err(err.into())
            }
            other => other,
        }
    }

    // ── Context ──────────────────────────────────────────────────────

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(ParseFailure::TooDeep(MAX_NESTING));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn with_scope<T>(
        &mut self,
        kind: ScopeKind,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        self.scopes.push(Scope { kind, loops: 0 });
        self.symbols.enter(kind.block());
        let result = f(self);
        self.symbols.leave();
        self.scopes.pop();
        result
    }

    fn in_loop<T>(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        self.adjust_loops(true);
        let result = f(self);
        self.adjust_loops(false);
        result
    }

    fn adjust_loops(&mut self, enter: bool) {
        if let Some(scope) = self.scopes.last_mut() {
            if enter {
                scope.loops += 1;
            } else {
                scope.loops = scope.loops.saturating_sub(1);
            }
        }
    }

    fn scope(&self) -> Scope {
        self.scopes.last().copied().unwrap_or(Scope {
            kind: ScopeKind::Module,
            loops: 0,
        })
    }

    fn in_async_function(&self) -> bool {
        self.scope().kind == ScopeKind::Function { is_async: true }
    }

    /// Run `f` and rewind, reporting whether it succeeded
    fn speculate(&mut self, f: impl FnOnce(&mut Self) -> ParseResult<bool>) -> ParseResult<bool> {
        let saved_pos = self.pos;
        let saved_deferred = self.deferred.clone();
        self.symbols.suspend();
        let result = f(self);
        self.symbols.resume();
        self.pos = saved_pos;
        self.deferred = saved_deferred;
        match result {
            Ok(matched) => Ok(matched),
            Err(ParseFailure::TooDeep(limit)) => Err(ParseFailure::TooDeep(limit)),
            Err(_) => Ok(false),
        }
    }

    /// Record a code generation error found at this point of the source
    fn defer(&mut self, tok: &Token, message: impl Into<String>) {
        let order = self.next_order();
        self.defer_at(Pass::Codegen, order, tok, message);
    }

    fn defer_at(&mut self, pass: Pass, order: usize, tok: &Token, message: impl Into<String>) {
        self.defer_error(pass, order, SyntaxError::syntax(message, tok.line, tok.col));
    }

    /// Keep whichever error CPython would raise first
    fn defer_error(&mut self, pass: Pass, order: usize, error: SyntaxError) {
        let first = self
            .deferred
            .as_ref()
            .map_or(true, |kept| (pass, order) < (kept.pass, kept.order));
        if first {
            self.deferred = Some(Deferred { pass, order, error });
        }
    }

    /// Reserve the next position in report order
    fn next_order(&mut self) -> usize {
        self.order += 1;
        self.order
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn check_kind(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_op(&self, op: &str) -> bool {
        let tok = self.peek();
        tok.kind == TokenKind::Op && tok.text == op
    }

    fn peek_op_at(&self, offset: usize, op: &str) -> bool {
        let tok = self.peek_at(offset);
        tok.kind == TokenKind::Op && tok.text == op
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        self.peek_keyword_at(0, keyword)
    }

    fn peek_keyword_at(&self, offset: usize, keyword: &str) -> bool {
        let tok = self.peek_at(offset);
        tok.kind == TokenKind::Name && tok.text == keyword
    }

    fn check_soft_keyword(&self, keyword: &str) -> bool {
        self.check_keyword(keyword)
    }

    fn can_start_expression(&self) -> bool {
        let tok = self.peek();
        match tok.kind {
            TokenKind::Name => {
                !is_keyword(&tok.text)
                    || matches!(
                        tok.text.as_str(),
                        "True" | "False" | "None" | "not" | "lambda" | "await"
                    )
            }
            TokenKind::Number | TokenKind::String => true,
            TokenKind::Op => matches!(
                tok.text.as_str(),
                "(" | "[" | "{" | "-" | "+" | "~" | "*" | "..."
            ),
            _ => false,
        }
    }

    fn at_statement_end(&self) -> bool {
        self.check_kind(TokenKind::Newline) || self.check_op(";")
    }

    fn advance(&mut self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        let index = self.pos.min(last);
        if self.pos < last {
            self.pos += 1;
        }
        &self.tokens[index]
    }

    fn eat_kind(&mut self, kind: TokenKind) -> bool {
        if self.check_kind(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.check_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_kind(&mut self, kind: TokenKind) -> ParseResult<()> {
        if self.eat_kind(kind) {
            Ok(())
        } else {
            Err(self.invalid_syntax())
        }
    }

    fn expect_op(&mut self, op: &str) -> ParseResult<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.invalid_syntax())
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> ParseResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.invalid_syntax())
        }
    }

    fn expect_colon(&mut self) -> ParseResult<()> {
        if self.eat_op(":") {
            Ok(())
        } else if self.check_op("=") {
            Err(self.fail("invalid syntax. Maybe you meant '==' or ':=' instead of '='?"))
        } else {
            Err(self.fail("expected ':'"))
        }
    }

    fn expect_name(&mut self) -> ParseResult<String> {
        let tok = self.peek();
        if tok.kind == TokenKind::Name && !is_keyword(&tok.text) {
            let name = tok.text.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.invalid_syntax())
        }
    }

    fn lex_failure(&self) -> ParseFailure {
        match &self.lex_error {
            Some(lex) => lex.error.clone().into(),
            None => {
                let tok = self.peek();
                SyntaxError::syntax(INVALID_SYNTAX, tok.line, tok.col).into()
            }
        }
    }

    fn fail(&self, message: impl Into<String>) -> ParseFailure {
        let tok = self.peek();
        if tok.kind == TokenKind::Error {
            return self.lex_failure();
        }
        fail_at(tok, message)
    }

    fn invalid_syntax(&self) -> ParseFailure {
        let tok = self.peek();
        match tok.kind {
            TokenKind::Error => self.lex_failure(),
            TokenKind::Indent => {
                SyntaxError::indentation("unexpected indent", tok.line, tok.col).into()
            }
            _ => fail_at(tok, INVALID_SYNTAX),
        }
    }
}

fn fail_at(tok: &Token, message: impl Into<String>) -> ParseFailure {
    SyntaxError::syntax(message, tok.line, tok.col).into()
}

fn invalid_target(target: &Expr, mode: TargetMode) -> Option<String> {
    match target {
        Expr::Name(_) | Expr::Attribute(_) | Expr::Subscript => None,
        Expr::Tuple(items) | Expr::List(items) => {
            let starred = items
                .iter()
                .filter(|item| matches!(item, Expr::Starred(_)))
                .count();
            if mode == TargetMode::Assign && starred > 1 {
                return Some("multiple starred expressions in assignment".into());
            }
            items.iter().find_map(|item| invalid_target(item, mode))
        }
        Expr::Starred(inner) => match mode {
            TargetMode::Assign => invalid_target(inner, mode),
            TargetMode::Delete => Some("cannot delete starred".into()),
        },
        other => Some(match mode {
            TargetMode::Assign => format!("cannot assign to {}", other.describe()),
            TargetMode::Delete => format!("cannot delete {}", other.describe()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SyntaxErrorKind;

    fn parses(source: &str) -> ParsedModule {
        match Parser::parse(source) {
            Ok(module) => module,
            Err(err) => panic!("expected {:?} to parse, got {}", source, err),
        }
    }

    fn syntax_error(source: &str) -> SyntaxError {
        match Parser::parse(source) {
            Err(ParseFailure::Syntax(err)) => err,
            other => panic!("expected a syntax error for {:?}, got {:?}", source, other),
        }
    }

    #[test]
    fn test_assignment_and_call() {
        let module = parses("x = 1\nprint(x)");
        assert_eq!(module.statements, 2);
    }

    #[test]
    fn test_function_with_parameters() {
        let module = parses(
            "def f(a, b=2, *args, c, d=4, **kwargs) -> int:\n    return a + b\n\n\
             def g(x, /, y, *, z):\n    pass\n",
        );
        assert_eq!(module.functions, vec!["f", "g"]);
    }

    #[test]
    fn test_factorial_program() {
        let source = "def fatorial(n):\n    if n == 0 or n == 1:\n        return 1\n    \
                      return n * fatorial(n-1)\n\nnum = int(input(\"Digite um número: \"))\n\
                      print(\"Fatorial:\", fatorial(num))\n";
        let module = parses(source);
        assert_eq!(module.functions, vec!["fatorial"]);
    }

    #[test]
    fn test_class_with_methods_and_decorators() {
        let source = "import dataclasses\n\n@dataclasses.dataclass\nclass Ponto(Base, metaclass=Meta):\n    \
                      x: int = 0\n\n    @property\n    def norma(self):\n        return (self.x ** 2) ** 0.5\n";
        let module = parses(source);
        assert_eq!(module.classes, vec!["Ponto"]);
        assert_eq!(module.functions, vec!["norma"]);
        assert_eq!(module.imports, vec!["dataclasses"]);
    }

    #[test]
    fn test_control_flow() {
        parses(
            "for i in range(10):\n    if i % 2:\n        continue\n    elif i > 7:\n        break\n    \
             else:\n        pass\nelse:\n    print('fim')\n\nwhile True:\n    break\n",
        );
    }

    #[test]
    fn test_try_statement() {
        parses(
            "try:\n    x = 1 / 0\nexcept (ZeroDivisionError, ValueError) as e:\n    print(e)\n\
             except Exception:\n    raise\nelse:\n    pass\nfinally:\n    print('ok')\n",
        );
    }

    #[test]
    fn test_with_statements() {
        parses("with open('a') as f, open('b') as g:\n    data = f.read()\n");
        parses("with (open('a') as f, open('b') as g):\n    pass\n");
        parses("with (open('a')) as f:\n    pass\n");
    }

    #[test]
    fn test_comprehensions_and_lambdas() {
        parses(
            "quadrados = [x * x for x in range(10) if x % 2 == 0]\n\
             pares = {k: v for k, v in itens.items()}\nconjunto = {a for a in b}\n\
             gerador = sum(x for x in dados)\nf = lambda a, b=1, *c, **d: a if b else c\n",
        );
    }

    #[test]
    fn test_expressions() {
        parses(
            "x = not a and b or c\ny = a is not None and b not in c\nz = -x ** 2 // 3 % 4 @ m\n\
             w = a[1:2, ::3][...]\nv = (yield_ := 5)\ns = f'{x}' 'y' r\"z\"\n\
             a, *b = [1, 2, 3]\n(c, d) = e = 1, 2\nt = ()\n",
        );
    }

    #[test]
    fn test_generators_and_async() {
        parses(
            "def gen():\n    x = yield 1\n    yield from range(3)\n\n\
             async def main():\n    async with lock:\n        await asyncio.sleep(1)\n    \
             async for item in stream():\n        print(item)\n",
        );
    }

    #[test]
    fn test_imports() {
        let module = parses(
            "import os.path as p, sys\nfrom . import irmao\nfrom ..pacote.modulo import (a, b as c,)\n\
             from collections import *\n",
        );
        assert_eq!(module.imports, vec!["os.path", "sys", ".", "..pacote.modulo", "collections"]);
    }

    #[test]
    fn test_match_statement() {
        parses(
            "match comando.split():\n    case [\"ir\", direcao]:\n        mover(direcao)\n    \
             case Ponto(x=0, y=0) | None:\n        pass\n    case {\"k\": 1, **resto}:\n        pass\n    \
             case -1 | 2 + 3j | \"s\" as valor if valor:\n        pass\n    case _:\n        pass\n",
        );
    }

    #[test]
    fn test_match_as_identifier() {
        parses("match = 5\nmatch(x)\nprint(match)\n");
    }

    #[test]
    fn test_semicolons_and_single_line_blocks() {
        parses("x = 1; y = 2;\nif x: y = 3\nwhile y: y -= 1\n");
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let module = parses("# só comentário\n\n   \n");
        assert_eq!(module.statements, 0);
        parses("");
    }

    #[test]
    fn test_missing_parameter_reports_line_one() {
        let err = syntax_error("def f(:\n  pass");
        assert_eq!(err.kind, SyntaxErrorKind::Syntax);
        assert_eq!(err.line, 1);
        assert_eq!(err.text, "def f(:");
        assert_eq!(err.message, INVALID_SYNTAX);
    }

    #[test]
    fn test_missing_colon() {
        let err = syntax_error("if x > 1\n    print(x)\n");
        assert_eq!(err.message, "expected ':'");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_assignment_in_condition() {
        let err = syntax_error("if x = 1:\n    pass\n");
        assert!(err.message.contains("Maybe you meant '=='"));
    }

    #[test]
    fn test_expected_indented_block() {
        let err = syntax_error("def f():\nreturn 1\n");
        assert_eq!(err.kind, SyntaxErrorKind::Indentation);
        assert_eq!(
            err.message,
            "expected an indented block after function definition on line 1"
        );
        assert_eq!(err.line, 2);
        assert_eq!(err.text, "return 1");
    }

    #[test]
    fn test_missing_block_at_end_points_at_last_line() {
        let err = syntax_error("for i in x:\n");
        assert_eq!(err.kind, SyntaxErrorKind::Indentation);
        assert_eq!(err.text, "for i in x:");
    }

    #[test]
    fn test_unexpected_indent() {
        let err = syntax_error("x = 1\n    y = 2\n");
        assert_eq!(err.kind, SyntaxErrorKind::Indentation);
        assert_eq!(err.message, "unexpected indent");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_unclosed_paren() {
        let err = syntax_error("print('oi'\n");
        assert_eq!(err.message, "'(' was never closed");
        assert_eq!(err.line, 1);

        let err = syntax_error("x = [1, 2, 3\ny = 4");
        assert_eq!(err.message, "'[' was never closed");
        assert_eq!(err.line, 1);
        assert_eq!(err.col, 5);
        assert_eq!(err.text, "x = [1, 2, 3");
    }

    #[test]
    fn test_tokenizer_error_overrides_generic() {
        let err = syntax_error("x = = 1\ny = 'aberta\n");
        assert!(err.message.starts_with("unterminated string literal"));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_invalid_assignment_targets() {
        assert_eq!(syntax_error("1 = x").message, "cannot assign to literal");
        assert_eq!(syntax_error("f() = 1").message, "cannot assign to function call");
        assert_eq!(syntax_error("a + b = c").message, "cannot assign to expression");
        assert_eq!(syntax_error("None = 1").message, "cannot assign to None");
        assert_eq!(syntax_error("for 1 in x:\n    pass").message, "cannot assign to literal");
        assert_eq!(
            syntax_error("a, *b, *c = d").message,
            "multiple starred expressions in assignment"
        );
        assert_eq!(
            syntax_error("(a, b) += 1").message,
            "'tuple' is an illegal expression for augmented assignment"
        );
        assert_eq!(syntax_error("del f()").message, "cannot delete function call");
    }

    #[test]
    fn test_return_outside_function() {
        let err = syntax_error("x = 1\nreturn x\n");
        assert_eq!(err.message, "'return' outside function");
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_parse_errors_win_over_compile_errors() {
        let err = syntax_error("return 1\ndef f(:\n    pass\n");
        assert_eq!(err.message, INVALID_SYNTAX);
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_loop_control_outside_loop() {
        assert_eq!(syntax_error("break").message, "'break' outside loop");
        assert_eq!(
            syntax_error("def f():\n    continue\n").message,
            "'continue' not properly in loop"
        );
        assert_eq!(
            syntax_error("for x in y:\n    def f():\n        break\n").message,
            "'break' outside loop"
        );
        parses("while True:\n    if x:\n        break\n");
    }

    #[test]
    fn test_yield_and_await_context() {
        assert_eq!(syntax_error("yield 1").message, "'yield' outside function");
        assert_eq!(syntax_error("await x").message, "'await' outside function");
        assert_eq!(
            syntax_error("def f():\n    await x\n").message,
            "'await' outside async function"
        );
        assert_eq!(
            syntax_error("def f():\n    async for a in b:\n        pass\n").message,
            "'async for' outside async function"
        );
    }

    #[test]
    fn test_parameter_rules() {
        assert_eq!(
            syntax_error("def f(a=1, b):\n    pass").message,
            "non-default argument follows default argument"
        );
        assert_eq!(
            syntax_error("def f(a, a):\n    pass").message,
            "duplicate argument 'a' in function definition"
        );
        assert_eq!(
            syntax_error("def f(*):\n    pass").message,
            "named arguments must follow bare *"
        );
        assert_eq!(
            syntax_error("def f(**k, a):\n    pass").message,
            "arguments cannot follow var-keyword argument"
        );
        assert_eq!(
            syntax_error("def f(/, a):\n    pass").message,
            "at least one argument must precede /"
        );
    }

    #[test]
    fn test_call_argument_rules() {
        assert_eq!(
            syntax_error("f(a=1, 2)").message,
            "positional argument follows keyword argument"
        );
        assert_eq!(
            syntax_error("f(x for x in y, 1)").message,
            "Generator expression must be parenthesized"
        );
        assert!(syntax_error("f(a.b=1)").message.starts_with("expression cannot contain assignment"));
    }

    #[test]
    fn test_python2_print() {
        let err = syntax_error("print 'ola'");
        assert_eq!(
            err.message,
            "Missing parentheses in call to 'print'. Did you mean print(...)?"
        );
    }

    #[test]
    fn test_try_without_handlers() {
        assert_eq!(
            syntax_error("try:\n    pass\nx = 1\n").message,
            "expected 'except' or 'finally' block"
        );
        assert_eq!(
            syntax_error("try:\n    pass\nexcept:\n    pass\nexcept ValueError:\n    pass\n").message,
            "default 'except:' must be last"
        );
    }

    #[test]
    fn test_mixed_bytes_and_str() {
        assert_eq!(
            syntax_error("x = b'a' 'b'").message,
            "cannot mix bytes and nonbytes literals"
        );
    }

    #[test]
    fn test_walrus_rules() {
        parses("if (n := len(a)) > 10:\n    pass\nwhile chunk := f.read():\n    pass\n");
        assert_eq!(syntax_error("x := 1").message, INVALID_SYNTAX);
        assert_eq!(
            syntax_error("if a.b := 1:\n    pass").message,
            "cannot use assignment expressions with attribute"
        );
    }

    #[test]
    fn test_nonlocal_at_module_level() {
        assert_eq!(
            syntax_error("nonlocal x").message,
            "nonlocal declaration not allowed at module level"
        );
    }

    #[test]
    fn test_starred_values() {
        assert_eq!(syntax_error("x = *a").message, "can't use starred expression here");
        assert_eq!(syntax_error("*a").message, "can't use starred expression here");
        assert_eq!(
            syntax_error("def f():\n    return *a\n").message,
            "can't use starred expression here"
        );
        let err = syntax_error("x = (*a)");
        assert_eq!(err.message, "cannot use starred expression here");
        assert_eq!(err.col, 6);
        parses("x = *a, *b\nfor i in *a, b:\n    pass\nprint(*a)\ny = [*a]\n*c, = d\n");
    }

    #[test]
    fn test_repeated_keyword_arguments() {
        let err = syntax_error("f(a=1, a=2)");
        assert_eq!(err.message, "keyword argument repeated: a");
        assert_eq!(err.col, 8);
        assert_eq!(
            syntax_error("class A(x=1, x=2):\n    pass\n").message,
            "keyword argument repeated: x"
        );
        parses("f(a=1, b=2, **c)\n");
    }

    #[test]
    fn test_fstring_fields_are_parsed() {
        assert_eq!(syntax_error("print(f'{x + }')").message, "f-string: invalid syntax");
        assert_eq!(
            syntax_error("s = f'{}'").message,
            "f-string: empty expression not allowed"
        );
        assert_eq!(
            syntax_error("s = f'{x!z}'").message,
            "f-string: invalid conversion character: expected 's', 'r', or 'a'"
        );
        assert_eq!(
            syntax_error("s = f'{await x}'").message,
            "'await' outside function"
        );
        parses("s = f'{a!r:>{width}} {b[\"k\"]} {c=} {{x}} {f\"{d}\"}'\n");
    }

    #[test]
    fn test_yield_from_in_async_function() {
        assert_eq!(
            syntax_error("async def f():\n    yield from x\n").message,
            "'yield from' inside async function"
        );
        parses("async def f():\n    yield x\n");
    }

    #[test]
    fn test_late_global_and_nonlocal() {
        let err = syntax_error("def f():\n    x = 1\n    global x\n");
        assert_eq!(err.message, "name 'x' is assigned to before global declaration");
        assert_eq!(err.line, 3);
        assert_eq!(
            syntax_error("def f():\n    print(x)\n    global x\n").message,
            "name 'x' is used prior to global declaration"
        );
        assert_eq!(
            syntax_error("def f(x):\n    global x\n").message,
            "name 'x' is parameter and global"
        );
        assert_eq!(
            syntax_error("def f():\n    global x\n    x: int = 1\n").message,
            "annotated name 'x' can't be global"
        );
        assert_eq!(
            syntax_error("def f():\n    nonlocal x\n").message,
            "no binding for nonlocal 'x' found"
        );
        parses(
            "x = 0\ndef f():\n    global x\n    x = 1\n\n\
             def g():\n    y = 0\n    def h():\n        nonlocal y\n        y += 1\n    \
             a = [i for i in range(3)]\n    global i\n    import os\n    global os\n",
        );
    }

    #[test]
    fn test_symbol_errors_come_before_compile_errors() {
        let err = syntax_error("def f():\n    return *a\n    x = 1\n    global x\n");
        assert_eq!(err.message, "name 'x' is assigned to before global declaration");
    }

    #[test]
    fn test_debug_is_read_only() {
        assert_eq!(syntax_error("__debug__ = 1").message, "cannot assign to __debug__");
        assert_eq!(syntax_error("del __debug__").message, "cannot delete __debug__");
        assert_eq!(syntax_error("__debug__ += 1").message, "cannot assign to __debug__");
        assert_eq!(syntax_error("obj.__debug__ = 1").message, "cannot assign to __debug__");
        assert_eq!(
            syntax_error("def f(__debug__):\n    pass\n").message,
            "cannot assign to __debug__"
        );
        assert_eq!(syntax_error("f(__debug__=1)").message, "cannot assign to __debug__");
        parses("print(__debug__)\n");
    }

    #[test]
    fn test_pattern_bindings() {
        let err = syntax_error("match x:\n    case a | b:\n        pass\n");
        assert_eq!(err.message, "name capture 'a' makes remaining patterns unreachable");
        assert_eq!((err.line, err.col), (2, 10));
        assert_eq!(
            syntax_error("match x:\n    case _:\n        pass\n    case 1:\n        pass\n").message,
            "wildcard makes remaining patterns unreachable"
        );
        assert_eq!(
            syntax_error("match x:\n    case y:\n        pass\n    case 1:\n        pass\n").message,
            "name capture 'y' makes remaining patterns unreachable"
        );
        assert_eq!(
            syntax_error("match x:\n    case [a, a]:\n        pass\n").message,
            "multiple assignments to name 'a' in pattern"
        );
        assert_eq!(
            syntax_error("match x:\n    case [a] | (b, c):\n        pass\n").message,
            "alternative patterns bind different names"
        );
        assert_eq!(
            syntax_error("match x:\n    case y as _:\n        pass\n").message,
            "cannot use '_' as a target"
        );
        parses(
            "match x:\n    case y if y > 0:\n        pass\n    case [a, *_] | (a, _):\n        pass\n    \
             case (z):\n        pass\n",
        );
    }

    #[test]
    fn test_keyword_glued_to_number() {
        parses("x = 1if y else 2\nz = [0x1for i in a]\n");
    }

    #[test]
    fn test_null_byte_is_not_a_syntax_error() {
        assert_eq!(Parser::parse("x = 1\0"), Err(ParseFailure::NullByte));
    }

    #[test]
    fn test_excessive_nesting_is_not_a_syntax_error() {
        let source = format!("x = {}1{}", "(".repeat(150), ")".repeat(150));
        assert_eq!(
            Parser::parse(&source),
            Err(ParseFailure::TooDeep(MAX_NESTING))
        );

        let source = format!("x = {}1", "-".repeat(150));
        assert_eq!(
            Parser::parse(&source),
            Err(ParseFailure::TooDeep(MAX_NESTING))
        );

        let source = format!("x = {}2", "2**".repeat(10_000));
        assert_eq!(
            Parser::parse(&source),
            Err(ParseFailure::TooDeep(MAX_NESTING))
        );

        let source = format!("for {}a in b:\n    pass\n", "*".repeat(10_000));
        assert_eq!(
            Parser::parse(&source),
            Err(ParseFailure::TooDeep(MAX_NESTING))
        );
    }

    #[test]
    fn test_moderate_nesting_is_fine() {
        let source = format!("x = {}1{}", "(".repeat(20), ")".repeat(20));
        parses(&source);
    }
}
