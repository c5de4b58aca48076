//! Symbol tables: what each scope binds, reads and declares
//!
//! Built while parsing and consulted for the errors CPython raises from
//! its symbol table pass: `global` / `nonlocal` statements that come too
//! late, and `nonlocal` names with nothing to refer to.

use std::collections::HashMap;

use crate::errors::SyntaxError;

/// Kind of block a table belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BlockKind {
    Module,
    Class,
    /// Functions and lambdas
    Function,
    Comprehension,
}

/// The two declaration statements
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Declaration {
    Global,
    Nonlocal,
}

impl Declaration {
    fn keyword(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Nonlocal => "nonlocal",
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Symbol {
    uses: usize,
    param: bool,
    assigned: bool,
    annotated: bool,
    imported: bool,
    global: bool,
    nonlocal: bool,
    /// Where the first declaration of this name is
    directive: Option<(usize, usize)>,
}

impl Symbol {
    fn binds(&self) -> bool {
        self.param || self.assigned || self.imported
    }
}

#[derive(Debug)]
struct Table {
    kind: BlockKind,
    parent: Option<usize>,
    names: Vec<String>,
    symbols: HashMap<String, Symbol>,
}

impl Table {
    fn symbol(&mut self, name: &str) -> &mut Symbol {
        if !self.symbols.contains_key(name) {
            self.names.push(name.to_string());
        }
        self.symbols.entry(name.to_string()).or_default()
    }
}

/// All tables of one module, in the order their blocks open
#[derive(Debug)]
pub(crate) struct Symbols {
    tables: Vec<Table>,
    /// Tables of the blocks currently open, innermost last
    open: Vec<usize>,
    /// Recording is off while nonzero
    suspended: usize,
    /// Every recorded read, as (table, name)
    loads: Vec<(usize, String)>,
}

impl Symbols {
    pub(crate) fn new() -> Self {
        Self {
            tables: vec![Table {
                kind: BlockKind::Module,
                parent: None,
                names: Vec::new(),
                symbols: HashMap::new(),
            }],
            open: vec![0],
            suspended: 0,
            loads: Vec::new(),
        }
    }

    pub(crate) fn enter(&mut self, kind: BlockKind) {
        let parent = self.open.last().copied();
        self.tables.push(Table {
            kind,
            parent,
            names: Vec::new(),
            symbols: HashMap::new(),
        });
        self.open.push(self.tables.len() - 1);
    }

    pub(crate) fn leave(&mut self) {
        if self.open.len() > 1 {
            self.open.pop();
        }
    }

    /// Position in the read log, for [`Self::enter_comprehension`]
    pub(crate) fn mark(&self) -> usize {
        self.loads.len()
    }

    /// Open a comprehension whose element was parsed before its `for` was
    /// seen. Reads of the current block since `mark` move into it.
    pub(crate) fn enter_comprehension(&mut self, mark: usize) {
        let enclosing = self.current_index();
        self.enter(BlockKind::Comprehension);
        let comprehension = self.current_index();
        let mark = mark.min(self.loads.len());
        for (table, name) in self.loads.split_off(mark) {
            if table != enclosing || self.suspended > 0 {
                continue;
            }
            if let Some(symbol) = self.tables[enclosing].symbols.get_mut(&name) {
                symbol.uses = symbol.uses.saturating_sub(1);
            }
            self.tables[comprehension].symbol(&name).uses += 1;
        }
    }

    /// Step out to the enclosing block; returns the table to [`Self::reopen`]
    pub(crate) fn step_out(&mut self) -> Option<usize> {
        if self.open.len() > 1 {
            self.open.pop()
        } else {
            None
        }
    }

    pub(crate) fn reopen(&mut self, table: Option<usize>) {
        if let Some(table) = table {
            self.open.push(table);
        }
    }

    pub(crate) fn suspend(&mut self) {
        self.suspended += 1;
    }

    pub(crate) fn resume(&mut self) {
        self.suspended = self.suspended.saturating_sub(1);
    }

    /// A name read in the current block
    pub(crate) fn load(&mut self, name: &str) {
        if let Some(symbol) = self.current(name) {
            symbol.uses += 1;
            let index = self.current_index();
            self.loads.push((index, name.to_string()));
        }
    }

    /// A name parsed as an expression that turned out to be a target
    pub(crate) fn store(&mut self, name: &str) {
        if let Some(symbol) = self.current(name) {
            symbol.uses = symbol.uses.saturating_sub(1);
            symbol.assigned = true;
        }
    }

    /// A name bound without being read first (definitions, captures, `as`)
    pub(crate) fn bind(&mut self, name: &str) {
        if let Some(symbol) = self.current(name) {
            symbol.assigned = true;
        }
    }

    pub(crate) fn bind_param(&mut self, name: &str) {
        if let Some(symbol) = self.current(name) {
            symbol.param = true;
        }
    }

    pub(crate) fn bind_import(&mut self, name: &str) {
        if let Some(symbol) = self.current(name) {
            symbol.imported = true;
        }
    }

    /// Target of `:=`, which binds in the nearest block that is not a comprehension
    pub(crate) fn bind_named(&mut self, name: &str) {
        if self.suspended > 0 {
            return;
        }
        let index = self
            .open
            .iter()
            .rev()
            .copied()
            .find(|&index| self.tables[index].kind != BlockKind::Comprehension)
            .unwrap_or(0);
        self.tables[index].symbol(name).assigned = true;
    }

    /// A simple annotated target, `name: annotation`
    pub(crate) fn annotate(&mut self, name: &str, line: usize, col: usize) -> Result<(), SyntaxError> {
        let at_module = self.current_kind() == BlockKind::Module;
        let Some(symbol) = self.current(name) else {
            return Ok(());
        };
        symbol.uses = symbol.uses.saturating_sub(1);
        let declared = if symbol.global {
            Some(Declaration::Global)
        } else if symbol.nonlocal {
            Some(Declaration::Nonlocal)
        } else {
            None
        };
        symbol.annotated = true;
        symbol.assigned = true;
        match declared {
            Some(declaration) if !at_module => Err(SyntaxError::syntax(
                format!("annotated name '{}' can't be {}", name, declaration.keyword()),
                line,
                col,
            )),
            _ => Ok(()),
        }
    }

    /// Record a `global` or `nonlocal` statement for `name`
    pub(crate) fn declare(
        &mut self,
        name: &str,
        declaration: Declaration,
        line: usize,
        col: usize,
    ) -> Result<(), SyntaxError> {
        let Some(symbol) = self.current(name) else {
            return Ok(());
        };
        let keyword = declaration.keyword();
        let problem = if symbol.param {
            Some(format!("name '{}' is parameter and {}", name, keyword))
        } else if symbol.uses > 0 {
            Some(format!("name '{}' is used prior to {} declaration", name, keyword))
        } else if symbol.annotated {
            Some(format!("annotated name '{}' can't be {}", name, keyword))
        } else if symbol.assigned {
            Some(format!("name '{}' is assigned to before {} declaration", name, keyword))
        } else {
            None
        };

        match declaration {
            Declaration::Global => symbol.global = true,
            Declaration::Nonlocal => symbol.nonlocal = true,
        }
        if symbol.directive.is_none() {
            symbol.directive = Some((line, col));
        }

        match problem {
            Some(message) => Err(SyntaxError::syntax(message, line, col)),
            None => Ok(()),
        }
    }

    /// First declaration that cannot be resolved once the whole module is known
    pub(crate) fn resolve(&self) -> Option<SyntaxError> {
        for (index, table) in self.tables.iter().enumerate() {
            for name in &table.names {
                let Some(symbol) = table.symbols.get(name) else {
                    continue;
                };
                let (line, col) = symbol.directive.unwrap_or((1, 1));
                if symbol.global && symbol.nonlocal {
                    return Some(SyntaxError::syntax(
                        format!("name '{}' is nonlocal and global", name),
                        line,
                        col,
                    ));
                }
                if !symbol.nonlocal {
                    continue;
                }
                if table.kind == BlockKind::Module {
                    return Some(SyntaxError::syntax(
                        "nonlocal declaration not allowed at module level",
                        line,
                        col,
                    ));
                }
                if !self.bound_outside(index, name) {
                    return Some(SyntaxError::syntax(
                        format!("no binding for nonlocal '{}' found", name),
                        line,
                        col,
                    ));
                }
            }
        }
        None
    }

    /// Whether an enclosing function binds `name`. Class blocks are
    /// transparent; a `global` declaration on the way hides the name.
    fn bound_outside(&self, index: usize, name: &str) -> bool {
        let mut current = self.tables[index].parent;
        while let Some(parent) = current {
            let table = &self.tables[parent];
            match table.kind {
                BlockKind::Module => return false,
                BlockKind::Class => {}
                BlockKind::Function | BlockKind::Comprehension => {
                    if let Some(symbol) = table.symbols.get(name) {
                        if symbol.global {
                            return false;
                        }
                        if symbol.binds() && !symbol.nonlocal {
                            return true;
                        }
                    }
                }
            }
            current = table.parent;
        }
        false
    }

    fn current_kind(&self) -> BlockKind {
        self.open
            .last()
            .map_or(BlockKind::Module, |&index| self.tables[index].kind)
    }

    fn current_index(&self) -> usize {
        self.open.last().copied().unwrap_or(0)
    }

    fn current(&mut self, name: &str) -> Option<&mut Symbol> {
        if self.suspended > 0 {
            return None;
        }
        let index = self.current_index();
        Some(self.tables[index].symbol(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<(), SyntaxError>) -> String {
        result.unwrap_err().message
    }

    #[test]
    fn test_late_declarations() {
        let mut symbols = Symbols::new();
        symbols.enter(BlockKind::Function);
        symbols.bind_param("a");
        symbols.load("b");
        symbols.load("c");
        symbols.store("c");
        assert_eq!(
            message(symbols.declare("a", Declaration::Global, 2, 5)),
            "name 'a' is parameter and global"
        );
        assert_eq!(
            message(symbols.declare("b", Declaration::Nonlocal, 3, 5)),
            "name 'b' is used prior to nonlocal declaration"
        );
        assert_eq!(
            message(symbols.declare("c", Declaration::Global, 4, 5)),
            "name 'c' is assigned to before global declaration"
        );
        assert!(symbols.declare("d", Declaration::Global, 5, 5).is_ok());
    }

    #[test]
    fn test_imports_do_not_block_global() {
        let mut symbols = Symbols::new();
        symbols.enter(BlockKind::Function);
        symbols.bind_import("os");
        assert!(symbols.declare("os", Declaration::Global, 2, 5).is_ok());
    }

    #[test]
    fn test_nonlocal_resolution() {
        let mut symbols = Symbols::new();
        symbols.enter(BlockKind::Function);
        symbols.enter(BlockKind::Class);
        symbols.enter(BlockKind::Function);
        symbols.declare("x", Declaration::Nonlocal, 4, 9).unwrap();
        symbols.leave();
        symbols.leave();
        // bound after the nested function, which still counts
        symbols.bind("x");
        assert!(symbols.resolve().is_none());

        let mut symbols = Symbols::new();
        symbols.enter(BlockKind::Function);
        symbols.declare("y", Declaration::Nonlocal, 2, 5).unwrap();
        let err = symbols.resolve().unwrap();
        assert_eq!(err.message, "no binding for nonlocal 'y' found");
        assert_eq!((err.line, err.col), (2, 5));
    }

    #[test]
    fn test_global_in_between_hides_binding() {
        let mut symbols = Symbols::new();
        symbols.enter(BlockKind::Function);
        symbols.bind("x");
        symbols.enter(BlockKind::Function);
        symbols.declare("x", Declaration::Global, 3, 9).unwrap();
        symbols.enter(BlockKind::Function);
        symbols.declare("x", Declaration::Nonlocal, 5, 13).unwrap();
        assert_eq!(
            symbols.resolve().unwrap().message,
            "no binding for nonlocal 'x' found"
        );
    }

    #[test]
    fn test_named_expression_skips_comprehensions() {
        let mut symbols = Symbols::new();
        symbols.enter(BlockKind::Function);
        symbols.enter(BlockKind::Comprehension);
        symbols.bind_named("total");
        symbols.leave();
        assert_eq!(
            message(symbols.declare("total", Declaration::Global, 3, 5)),
            "name 'total' is assigned to before global declaration"
        );
    }

    #[test]
    fn test_comprehension_takes_over_element_reads() {
        let mut symbols = Symbols::new();
        symbols.enter(BlockKind::Function);
        let mark = symbols.mark();
        symbols.load("i");
        symbols.enter_comprehension(mark);
        symbols.bind("i");
        symbols.leave();
        assert!(symbols.declare("i", Declaration::Global, 3, 5).is_ok());
    }

    #[test]
    fn test_suspended_recording() {
        let mut symbols = Symbols::new();
        symbols.enter(BlockKind::Function);
        symbols.suspend();
        symbols.load("x");
        symbols.resume();
        assert!(symbols.declare("x", Declaration::Global, 2, 5).is_ok());
    }
}
