//! Loop extraction.
//!
//! Each back-edge of a function body yields a [`Loop`]: a standalone copy of
//! the instructions from the loop head up to and including the back-edge,
//! plus every variable the loop can write, directly or through the functions
//! it calls. Jumps out of the loop land on an `END_FUNCTION` appended after
//! the back-edge.

use crate::error::{GotoError, GotoResult};
use crate::functions::GotoFunctions;
use crate::instruction::{InstrId, Instruction, InstructionKind};
use crate::program::GotoProgram;
use gbmc_expr::{Expr, ExprKind, SymbolTable, INTERNAL_PREFIX, RETURN_VALUE_SUFFIX, TEMPORARY_MARKER};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{self, Write};
use tracing::debug;

/// One extracted loop.
#[derive(Debug)]
pub struct Loop {
    program: GotoProgram,
    original_loop_head: InstrId,
    original_loop_exit: InstrId,
    modified_variables: BTreeMap<String, Expr>,
    exit_edges: Vec<(InstrId, InstrId)>,
}

impl Loop {
    fn new(original_loop_head: InstrId, original_loop_exit: InstrId) -> Self {
        Self {
            program: GotoProgram::new(),
            original_loop_head,
            original_loop_exit,
            modified_variables: BTreeMap::new(),
            exit_edges: Vec::new(),
        }
    }

    /// The copied loop body; targets point into this program only.
    pub fn program(&self) -> &GotoProgram {
        &self.program
    }

    /// Loop head in the enclosing function.
    pub fn original_loop_head(&self) -> InstrId {
        self.original_loop_head
    }

    /// The back-edge closing the loop, in the enclosing function.
    pub fn original_loop_exit(&self) -> InstrId {
        self.original_loop_exit
    }

    /// Written variables, sorted by qualified name.
    pub fn modified_variables(&self) -> impl Iterator<Item = &Expr> {
        self.modified_variables.values()
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.modified_variables.keys().map(String::as_str).collect()
    }

    pub fn contains_variable(&self, name: &str) -> bool {
        self.modified_variables.contains_key(name)
    }

    /// Jumps leaving the loop body: `(copied instruction, original target)`.
    /// In the copy these jumps target the trailing end marker instead.
    pub fn exit_edges(&self) -> &[(InstrId, InstrId)] {
        &self.exit_edges
    }

    pub fn add_var_to_loop(&mut self, expr: &Expr) {
        if let Some(name) = expr.symbol_name() {
            self.modified_variables
                .entry(name.to_string())
                .or_insert_with(|| expr.clone());
        }
    }

    pub fn output<W: Write>(&self, ns: &SymbolTable, out: &mut W) -> fmt::Result {
        self.program.output(ns, out)?;
        if !self.modified_variables.is_empty() {
            let names = self.variable_names();
            writeln!(out, "Loop variables: {}", names.join(", "))?;
        }
        Ok(())
    }
}

/// Loops of one function, keyed by loop head.
pub struct GotoLoops<'a> {
    function_name: String,
    functions: &'a GotoFunctions,
    loops: Vec<Loop>,
}

impl<'a> GotoLoops<'a> {
    pub fn new(function_name: &str, functions: &'a GotoFunctions) -> Self {
        Self {
            function_name: function_name.to_string(),
            functions,
            loops: Vec::new(),
        }
    }

    /// Extract every loop of the function. The body must be numbered.
    pub fn find_function_loops(&mut self) -> GotoResult<()> {
        let functions = self.functions;
        let function = functions
            .get(&self.function_name)
            .ok_or_else(|| GotoError::MissingFunction {
                name: self.function_name.clone(),
            })?;
        let body = &function.body;

        let mut targets: HashMap<u32, InstrId> = HashMap::new();
        for (id, instr) in body.iter() {
            if instr.is_target() {
                targets.insert(instr.location_number, id);
            }

            if !body.is_backwards_goto(id) {
                continue;
            }
            if instr.targets.len() != 1 {
                return Err(GotoError::MalformedBackEdge {
                    instruction: id,
                    count: instr.targets.len(),
                });
            }
            let target_location = body.instruction(instr.targets[0])?.location_number;
            if target_location == instr.location_number {
                continue;
            }
            let head = *targets
                .get(&target_location)
                .ok_or(GotoError::UnknownLoopHead {
                    location_number: target_location,
                })?;
            self.create_function_loop(body, head, id)?;
        }
        Ok(())
    }

    /// Copy `[head, exit]` into a new loop, collecting written variables
    /// along the way.
    pub fn create_function_loop(
        &mut self,
        body: &GotoProgram,
        head: InstrId,
        exit: InstrId,
    ) -> GotoResult<()> {
        let start = body.position(head).ok_or(GotoError::NotInProgram(head))?;
        let end = body.position(exit).ok_or(GotoError::NotInProgram(exit))?;

        let mut lp = Loop::new(head, exit);
        let mut visited = BTreeSet::from([self.function_name.clone()]);
        let mut map = HashMap::new();

        for &old_id in &body.ids()[start..end] {
            let instr = body.instruction(old_id)?;
            self.collect_modified(instr, &mut lp, &mut visited)?;
            let new_id = lp.program.add(instr.clone());
            map.insert(old_id, new_id);
        }
        let new_exit = lp.program.add(body.instruction(exit)?.clone());
        map.insert(exit, new_exit);

        // jumps leaving the span go to one synthetic end marker
        let copied: Vec<InstrId> = lp.program.ids().to_vec();
        let mut outside = None;
        for id in copied {
            let targets = lp.program.instruction(id)?.targets.clone();
            let mut rewritten = Vec::with_capacity(targets.len());
            for target in targets {
                match map.get(&target) {
                    Some(&new_target) => rewritten.push(new_target),
                    None => {
                        lp.exit_edges.push((id, target));
                        let end = *outside
                            .get_or_insert_with(|| lp.program.add(Instruction::end_function()));
                        rewritten.push(end);
                    }
                }
            }
            if let Some(instr) = lp.program.get_mut(id) {
                instr.targets = rewritten;
            }
        }
        lp.program.update()?;

        debug!(
            function = %self.function_name,
            instructions = lp.program.len(),
            variables = lp.modified_variables.len(),
            "extracted loop"
        );

        // a later back-edge to the same head spans more, so it wins
        match self
            .loops
            .iter_mut()
            .find(|l| l.original_loop_head == head)
        {
            Some(existing) => *existing = lp,
            None => self.loops.push(lp),
        }
        Ok(())
    }

    /// Add what `instr` writes to `lp`, treating calls to
    /// `current_function` as recursion.
    pub fn get_modified_variables(
        &self,
        instr: &Instruction,
        lp: &mut Loop,
        current_function: &str,
    ) -> GotoResult<()> {
        let mut visited = BTreeSet::from([current_function.to_string()]);
        self.collect_modified(instr, lp, &mut visited)
    }

    /// Worklist over callees; a function is walked at most once, which
    /// also cuts mutual recursion.
    fn collect_modified(
        &self,
        instr: &Instruction,
        lp: &mut Loop,
        visited: &mut BTreeSet<String>,
    ) -> GotoResult<()> {
        let mut worklist = Vec::new();
        self.scan_instruction(instr, lp, visited, &mut worklist)?;

        while let Some(name) = worklist.pop() {
            let Some(function) = self.functions.get(&name) else {
                return Err(GotoError::MissingFunction { name });
            };
            if !function.body_available {
                continue;
            }
            for (_, callee_instr) in function.body.iter() {
                self.scan_instruction(callee_instr, lp, visited, &mut worklist)?;
            }
        }
        Ok(())
    }

    fn scan_instruction(
        &self,
        instr: &Instruction,
        lp: &mut Loop,
        visited: &mut BTreeSet<String>,
        worklist: &mut Vec<String>,
    ) -> GotoResult<()> {
        match &instr.kind {
            InstructionKind::Assign { target, .. } => add_loop_var(lp, target),
            InstructionKind::FunctionCall { ret, function, .. } => {
                if let Some(ret) = ret {
                    add_loop_var(lp, ret);
                }
                // calls through function pointers are not followed
                let Some(callee) = function.symbol_name() else {
                    return Ok(());
                };
                if visited.contains(callee) {
                    return Ok(());
                }
                if self.functions.get(callee).is_none() {
                    return Err(GotoError::MissingFunction {
                        name: callee.to_string(),
                    });
                }
                visited.insert(callee.to_string());
                worklist.push(callee.to_string());
            }
            _ => {}
        }
        Ok(())
    }

    pub fn loops(&self) -> &[Loop] {
        &self.loops
    }

    pub fn get(&self, head: InstrId) -> Option<&Loop> {
        self.loops.iter().find(|l| l.original_loop_head == head)
    }

    pub fn len(&self) -> usize {
        self.loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    pub fn output<W: Write>(&self, ns: &SymbolTable, out: &mut W) -> fmt::Result {
        for lp in &self.loops {
            lp.output(ns, out)?;
        }
        Ok(())
    }
}

/// Record the variables named in a written expression.
fn add_loop_var(lp: &mut Loop, expr: &Expr) {
    match &expr.kind {
        ExprKind::Symbol(name) if !expr.ty.is_code() => {
            if check_var_name(name) {
                lp.add_var_to_loop(expr);
            }
        }
        _ => {
            for operand in expr.operands() {
                add_loop_var(lp, operand);
            }
        }
    }
}

/// Temporaries, tool-internal symbols and return-value slots are not loop
/// variables.
fn check_var_name(name: &str) -> bool {
    if name.contains(TEMPORARY_MARKER) || name.ends_with(RETURN_VALUE_SUFFIX) {
        return false;
    }
    let base = name.rsplit("::").next().unwrap_or(name);
    !base.starts_with(INTERNAL_PREFIX)
}
