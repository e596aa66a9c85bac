//! Symbol table mapping qualified names to declarations.

use crate::expr::Expr;
use crate::location::Location;
use crate::types::Type;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SymbolError {
    #[error("symbol '{name}' is already defined")]
    Duplicate { name: String },
}

pub type SymbolResult<T> = Result<T, SymbolError>;

/// A declaration in the symbol table.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// Fully qualified name, e.g. `c::main::x`.
    pub name: String,
    /// Unqualified source name, e.g. `x`.
    pub base_name: String,
    /// Name shown to users; empty when the qualified name should be used.
    pub pretty_name: String,
    pub module: String,
    pub ty: Type,
    /// Initial value or function body marker.
    pub value: Option<Expr>,
    pub location: Location,
    pub lvalue: bool,
    pub static_lifetime: bool,
    /// Macro substitution: uses are replaced by `value`.
    pub is_macro: bool,
    pub is_type: bool,
}

impl Symbol {
    /// An lvalue variable whose pretty name is its base name.
    pub fn variable(name: &str, base_name: &str, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            base_name: base_name.to_string(),
            pretty_name: base_name.to_string(),
            module: String::new(),
            ty,
            value: None,
            location: Location::default(),
            lvalue: true,
            static_lifetime: false,
            is_macro: false,
            is_type: false,
        }
    }

    /// A function declaration.
    pub fn function(name: &str, base_name: &str, ty: Type) -> Self {
        Self {
            lvalue: false,
            ..Self::variable(name, base_name, ty)
        }
    }

    pub fn with_static_lifetime(mut self) -> Self {
        self.static_lifetime = true;
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn with_pretty_name(mut self, pretty_name: &str) -> Self {
        self.pretty_name = pretty_name.to_string();
        self
    }

    /// As an expression referring to this symbol.
    pub fn symbol_expr(&self) -> Expr {
        Expr::symbol(&self.name, self.ty.clone())
    }
}

/// Read-only name resolution for renderers and analyses.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: BTreeMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol) -> SymbolResult<()> {
        if self.symbols.contains_key(&symbol.name) {
            return Err(SymbolError::Duplicate { name: symbol.name });
        }
        self.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Pretty name if declared and non-empty, otherwise the name as given.
    pub fn display_name<'a>(&'a self, name: &'a str) -> &'a str {
        match self.symbols.get(name) {
            Some(sym) if !sym.pretty_name.is_empty() => &sym.pretty_name,
            _ => name,
        }
    }

    /// Base name if declared, otherwise empty.
    pub fn base_name(&self, name: &str) -> &str {
        self.symbols
            .get(name)
            .map(|s| s.base_name.as_str())
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_rejected() {
        let mut ns = SymbolTable::new();
        ns.insert(Symbol::variable("c::x", "x", Type::int())).unwrap();
        let err = ns
            .insert(Symbol::variable("c::x", "x", Type::int()))
            .unwrap_err();
        assert_eq!(
            err,
            SymbolError::Duplicate {
                name: "c::x".to_string()
            }
        );
    }

    #[test]
    fn test_display_name() {
        let mut ns = SymbolTable::new();
        ns.insert(Symbol::variable("c::main::x", "x", Type::int()))
            .unwrap();
        ns.insert(Symbol::variable("c::main::y", "y", Type::int()).with_pretty_name(""))
            .unwrap();
        assert_eq!(ns.display_name("c::main::x"), "x");
        assert_eq!(ns.display_name("c::main::y"), "c::main::y");
        assert_eq!(ns.display_name("c::unknown"), "c::unknown");
        assert_eq!(ns.base_name("c::main::y"), "y");
        assert_eq!(ns.base_name("c::unknown"), "");
    }
}
