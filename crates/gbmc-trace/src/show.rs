//! Human-readable counterexamples.

use crate::printf::PrintfFormatter;
use crate::step::{GotoTrace, StepKind, TraceStep};
use gbmc_expr::{Constant, Expr, ExprKind, ExprPrinter, Location, SymbolTable};
use gbmc_goto::InstructionKind;
use std::fmt::{self, Write};

const STATE_RULE: &str = "----------------------------------------------------";

/// Blank line, `State N <location> thread T`, the call stack, then a rule.
pub fn show_state_header<W: Write>(
    out: &mut W,
    step: &TraceStep<'_>,
    location: &Location,
    step_nr: u32,
) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "State {step_nr} {location} thread {}", step.thread_nr)?;
    for frame in &step.stack_trace {
        writeln!(out, "{frame}")?;
    }
    writeln!(out, "{STATE_RULE}")
}

/// `  name=value`, with the decimal form appended for bit-vector and
/// fixed-point constants.
pub fn counterexample_value<W: Write>(
    out: &mut W,
    ns: &SymbolTable,
    lhs: Option<&Expr>,
    value: Option<&Expr>,
) -> fmt::Result {
    let mut printer = ExprPrinter::new(ns);

    let value_string = match value {
        None => "(assignment removed)".to_string(),
        Some(value) => {
            let mut text = printer.print(value);
            match (&value.kind, &value.ty) {
                (ExprKind::Constant(Constant::Int(v)), ty) if ty.is_bv() => {
                    text.push_str(&format!(" ({v})"));
                }
                (ExprKind::Constant(Constant::Fixedbv(_)), ty) if ty.is_fixedbv() => {
                    let decimal = value
                        .as_f64()
                        .map(|v| v.to_string())
                        .unwrap_or_default();
                    text.push_str(&format!(" ({decimal})"));
                }
                _ => {}
            }
            text
        }
    };

    let name = match lhs {
        Some(lhs) => match lhs.symbol_name() {
            Some(name) => ns.display_name(name).to_string(),
            None => printer.print(lhs),
        },
        None => String::new(),
    };
    writeln!(out, "  {name}={value_string}")
}

/// Render a counterexample. Output stops after the first failed assertion.
pub fn show_goto_trace<W: Write>(
    out: &mut W,
    ns: &SymbolTable,
    trace: &GotoTrace<'_>,
) -> fmt::Result {
    let mut prev_step_nr = 0;
    let mut first_step = true;
    let mut formatter = PrintfFormatter::new(ns);

    for step in trace.iter() {
        match step.kind {
            StepKind::Assert => {
                if step.guard {
                    continue;
                }
                show_state_header(out, step, &step.pc.location, step.step_nr)?;
                writeln!(out, "Violated property:")?;
                if !step.pc.location.is_nil() {
                    writeln!(out, "  {}", step.pc.location)?;
                }
                writeln!(out, "  {}", step.comment)?;
                if step.pc.is_assert() {
                    writeln!(out, "  {}", ExprPrinter::new(ns).print(&step.pc.guard))?;
                }
                writeln!(out)?;
                return Ok(());
            }
            StepKind::Assume | StepKind::Skip => {}
            StepKind::Assignment => {
                let shown = step.pc.is_assign()
                    || step.pc.is_return()
                    || (matches!(step.pc.kind, InstructionKind::Other { .. }) && step.lhs.is_none());
                if !shown {
                    continue;
                }
                if prev_step_nr != step.step_nr || first_step {
                    first_step = false;
                    prev_step_nr = step.step_nr;
                    show_state_header(out, step, &step.pc.location, step.step_nr)?;
                }
                let lhs = step.original_lhs.as_ref().or(step.lhs.as_ref());
                counterexample_value(out, ns, lhs, step.value.as_ref())?;
            }
            StepKind::Output => {
                let text = formatter.format(&step.format_string, &step.output_args);
                writeln!(out, "{text}")?;
            }
            StepKind::Renumber => {
                write!(out, "Renumbered pointer to ")?;
                counterexample_value(out, ns, step.lhs.as_ref(), step.value.as_ref())?;
            }
        }
    }
    Ok(())
}
