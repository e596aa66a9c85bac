//! Whole-program function table.

use crate::error::GotoResult;
use crate::program::GotoProgram;
use gbmc_expr::{SymbolTable, Type};
use std::collections::BTreeMap;
use std::fmt::{self, Write};

/// One function: its body and signature.
#[derive(Debug, Default)]
pub struct GotoFunction {
    pub body: GotoProgram,
    /// False for declarations without a definition (library stubs).
    pub body_available: bool,
    pub ty: Option<Type>,
}

impl GotoFunction {
    pub fn new(body: GotoProgram) -> Self {
        Self {
            body,
            body_available: true,
            ty: None,
        }
    }

    /// A declared function whose body is not available.
    pub fn declaration(ty: Type) -> Self {
        Self {
            body: GotoProgram::new(),
            body_available: false,
            ty: Some(ty),
        }
    }
}

/// Functions by qualified name, in name order.
#[derive(Debug, Default)]
pub struct GotoFunctions {
    function_map: BTreeMap<String, GotoFunction>,
}

impl GotoFunctions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a function.
    pub fn insert(&mut self, name: &str, function: GotoFunction) -> Option<GotoFunction> {
        self.function_map.insert(name.to_string(), function)
    }

    pub fn get(&self, name: &str) -> Option<&GotoFunction> {
        self.function_map.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut GotoFunction> {
        self.function_map.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &GotoFunction)> {
        self.function_map.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.function_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.function_map.is_empty()
    }

    /// Number locations globally across functions, then targets per function.
    pub fn update(&mut self) -> GotoResult<()> {
        let mut counter = 0;
        for function in self.function_map.values_mut() {
            function.body.compute_location_numbers(&mut counter);
        }
        for function in self.function_map.values_mut() {
            function.body.compute_target_numbers()?;
        }
        Ok(())
    }

    /// Loop numbers from one counter shared by all functions.
    pub fn compute_loop_numbers(&mut self) {
        let mut counter = 0;
        for function in self.function_map.values_mut() {
            function.body.compute_loop_numbers(&mut counter);
        }
    }

    /// Render every function with a body.
    pub fn output<W: Write>(&self, ns: &SymbolTable, out: &mut W) -> fmt::Result {
        for (name, function) in &self.function_map {
            if !function.body_available {
                continue;
            }
            writeln!(out, "{name}:")?;
            function.body.output(ns, out)?;
            writeln!(out)?;
        }
        Ok(())
    }
}
