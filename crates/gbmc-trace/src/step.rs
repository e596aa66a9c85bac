//! Trace steps recorded by one symbolic execution run.

use crate::error::{TraceError, TraceResult};
use gbmc_expr::{Expr, ExprPrinter, SymbolTable};
use gbmc_goto::{Instruction, InstructionKind};
use std::fmt::{self, Write};

/// What a step records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Assert,
    Assume,
    Assignment,
    /// A `printf`-like output call.
    Output,
    /// A pointer was renumbered to a fresh object.
    Renumber,
    /// Deliberately ignored.
    Skip,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::Assert => "ASSERT",
            StepKind::Assume => "ASSUME",
            StepKind::Assignment => "ASSIGNMENT",
            StepKind::Output => "OUTPUT",
            StepKind::Renumber => "RENUMBER",
            StepKind::Skip => "SKIP",
        };
        f.write_str(name)
    }
}

/// One step of a counterexample. Steps sharing a step number form one state.
#[derive(Debug, Clone)]
pub struct TraceStep<'a> {
    pub kind: StepKind,
    /// Instruction that produced the step.
    pub pc: &'a Instruction,
    /// Truth value of an assertion or assumption.
    pub guard: bool,
    /// Renamed left-hand side as seen by the solver.
    pub lhs: Option<Expr>,
    /// Left-hand side as written in the source; preferred for display.
    pub original_lhs: Option<Expr>,
    /// Symbolic right-hand side.
    pub rhs: Option<Expr>,
    /// Value from the solver model. `None` when the assignment was sliced away.
    pub value: Option<Expr>,
    pub step_nr: u32,
    pub thread_nr: u32,
    /// Active functions, outermost first.
    pub stack_trace: Vec<String>,
    /// Message of a violated assertion.
    pub comment: String,
    pub format_string: String,
    pub output_args: Vec<Expr>,
}

impl<'a> TraceStep<'a> {
    pub fn new(kind: StepKind, pc: &'a Instruction, step_nr: u32) -> Self {
        Self {
            kind,
            pc,
            guard: true,
            lhs: None,
            original_lhs: None,
            rhs: None,
            value: None,
            step_nr,
            thread_nr: 0,
            stack_trace: Vec::new(),
            comment: String::new(),
            format_string: String::new(),
            output_args: Vec::new(),
        }
    }

    pub fn assignment(pc: &'a Instruction, step_nr: u32, lhs: Expr, value: Expr) -> Self {
        let mut step = Self::new(StepKind::Assignment, pc, step_nr);
        step.original_lhs = Some(lhs.clone());
        step.lhs = Some(lhs);
        step.value = Some(value);
        step
    }

    /// An assertion check; the comment defaults to the location's message.
    pub fn assertion(pc: &'a Instruction, step_nr: u32, guard: bool) -> Self {
        let mut step = Self::new(StepKind::Assert, pc, step_nr);
        step.guard = guard;
        step.comment = pc.location.comment.clone();
        step
    }

    pub fn assumption(pc: &'a Instruction, step_nr: u32, guard: bool) -> Self {
        let mut step = Self::new(StepKind::Assume, pc, step_nr);
        step.guard = guard;
        step
    }

    pub fn output(pc: &'a Instruction, step_nr: u32, format: &str, args: Vec<Expr>) -> Self {
        let mut step = Self::new(StepKind::Output, pc, step_nr);
        step.format_string = format.to_string();
        step.output_args = args;
        step
    }

    pub fn renumber(pc: &'a Instruction, step_nr: u32, lhs: Expr, value: Expr) -> Self {
        let mut step = Self::new(StepKind::Renumber, pc, step_nr);
        step.lhs = Some(lhs);
        step.value = Some(value);
        step
    }

    pub fn with_rhs(mut self, rhs: Expr) -> Self {
        self.rhs = Some(rhs);
        self
    }

    pub fn with_original_lhs(mut self, lhs: Expr) -> Self {
        self.original_lhs = Some(lhs);
        self
    }

    /// Drop the model value, as when the assignment was sliced away.
    pub fn without_value(mut self) -> Self {
        self.value = None;
        self
    }

    pub fn with_thread(mut self, thread_nr: u32) -> Self {
        self.thread_nr = thread_nr;
        self
    }

    pub fn with_stack_trace(mut self, stack_trace: Vec<String>) -> Self {
        self.stack_trace = stack_trace;
        self
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }

    /// A failed assertion.
    pub fn is_violation(&self) -> bool {
        self.kind == StepKind::Assert && !self.guard
    }

    /// Qualified name of the assigned symbol, source name first.
    pub fn identifier(&self) -> Option<&str> {
        self.original_lhs
            .as_ref()
            .and_then(Expr::symbol_name)
            .or_else(|| self.lhs.as_ref().and_then(Expr::symbol_name))
    }

    /// Debug dump of the step.
    pub fn output_debug<W: Write>(&self, ns: &SymbolTable, out: &mut W) -> fmt::Result {
        let mut printer = ExprPrinter::new(ns);

        write!(out, "*** {}", self.kind)?;
        if matches!(self.kind, StepKind::Assert | StepKind::Assume) {
            write!(out, " ({})", self.guard)?;
        }
        writeln!(out)?;

        if !self.pc.location.is_nil() {
            writeln!(out, "{}", self.pc.location)?;
        }

        let tag = match &self.pc.kind {
            InstructionKind::Goto => "GOTO   ",
            InstructionKind::Assume => "ASSUME ",
            InstructionKind::Assert => "ASSERT ",
            InstructionKind::Other { .. } => "OTHER  ",
            InstructionKind::Assign { .. } => "ASSIGN ",
            InstructionKind::FunctionCall { .. } => "CALL   ",
            _ => "(?)    ",
        };
        writeln!(out, "{tag}")?;

        let is_write = matches!(
            self.pc.kind,
            InstructionKind::Other { .. } | InstructionKind::Assign { .. }
        );
        if is_write {
            let value = self
                .value
                .as_ref()
                .map(|v| printer.print(v))
                .unwrap_or_default();
            writeln!(out, "  {} = {}", self.identifier().unwrap_or(""), value)?;
        } else if self.pc.is_assert() && !self.guard {
            writeln!(out, "Violated property:")?;
            if !self.pc.location.is_nil() {
                writeln!(out, "  {}", self.pc.location)?;
            }
            if !self.comment.is_empty() {
                writeln!(out, "  {}", self.comment)?;
            }
            writeln!(out, "  {}", printer.print(&self.pc.guard))?;
            writeln!(out)?;
        }

        writeln!(out)
    }
}

/// Steps of one run, in execution order.
#[derive(Debug, Clone, Default)]
pub struct GotoTrace<'a> {
    steps: Vec<TraceStep<'a>>,
}

impl<'a> GotoTrace<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step. Step numbers may repeat but never decrease.
    pub fn push(&mut self, step: TraceStep<'a>) -> TraceResult<()> {
        if let Some(last) = self.steps.last() {
            if step.step_nr < last.step_nr {
                return Err(TraceError::NonMonotonicStep {
                    previous: last.step_nr,
                    step: step.step_nr,
                });
            }
        }
        self.steps.push(step);
        Ok(())
    }

    pub fn steps(&self) -> &[TraceStep<'a>] {
        &self.steps
    }

    pub fn iter(&self) -> impl Iterator<Item = &TraceStep<'a>> {
        self.steps.iter()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Debug dump of every step.
    pub fn output<W: Write>(&self, ns: &SymbolTable, out: &mut W) -> fmt::Result {
        for step in &self.steps {
            step.output_debug(ns, out)?;
        }
        Ok(())
    }
}
