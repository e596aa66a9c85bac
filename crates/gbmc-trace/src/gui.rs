//! Line-oriented trace records for GUI front ends.
//!
//! A `TRACE` record is 6 lines and a `FAILED` record is 7:
//!
//! ```text
//! TRACE                         FAILED
//! identifier,base,type,value    <comment>
//! <step number>                 <empty value>
//! <file>                        <empty PC>
//! <line>                        <file>
//! <column>                      <line>
//!                               <column>
//! ```
//!
//! A location-only `TRACE` record has `,,,` as its second line.

use crate::error::{TraceError, TraceResult};
use crate::step::{GotoTrace, StepKind};
use gbmc_expr::{ExprPrinter, Location, SymbolTable};
use std::fmt::{self, Write};

/// One parsed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuiRecord {
    Failed {
        comment: String,
        file: String,
        line: u32,
        column: u32,
    },
    /// An assignment, or a bare location change when `identifier` is empty.
    Trace {
        identifier: String,
        base_name: String,
        type_id: String,
        value: String,
        step_nr: u32,
        file: String,
        line: u32,
        column: u32,
    },
}

impl GuiRecord {
    pub fn is_location_only(&self) -> bool {
        matches!(self, GuiRecord::Trace { identifier, .. } if identifier.is_empty())
    }
}

/// Emit GUI records for every failed assertion, every assignment, and every
/// change of source location in between.
pub fn show_goto_trace_gui<W: Write>(
    out: &mut W,
    ns: &SymbolTable,
    trace: &GotoTrace<'_>,
) -> fmt::Result {
    let mut printer = ExprPrinter::new(ns);
    let mut previous_location = Location::default();

    for step in trace.iter() {
        let location = &step.pc.location;

        if step.is_violation() {
            writeln!(out, "FAILED")?;
            writeln!(out, "{}", step.comment)?;
            writeln!(out)?; // value
            writeln!(out)?; // PC
            writeln!(out, "{}", location.file)?;
            writeln!(out, "{}", location.line)?;
            writeln!(out, "{}", location.column)?;
        } else if step.kind == StepKind::Assignment {
            let identifier = step.identifier().unwrap_or("");
            let value = step
                .value
                .as_ref()
                .map(|v| printer.print(v))
                .unwrap_or_default();
            let type_id = step
                .value
                .as_ref()
                .or(step.lhs.as_ref())
                .map(|e| e.ty.type_id())
                .unwrap_or("");

            writeln!(out, "TRACE")?;
            writeln!(
                out,
                "{},{},{},{}",
                identifier,
                ns.base_name(identifier),
                type_id,
                value
            )?;
            writeln!(out, "{}", step.step_nr)?;
            writeln!(out, "{}", location.file)?;
            writeln!(out, "{}", location.line)?;
            writeln!(out, "{}", location.column)?;
        } else if *location != previous_location && !location.file.is_empty() {
            writeln!(out, "TRACE")?;
            writeln!(out, ",,,")?;
            writeln!(out, "{}", step.step_nr)?;
            writeln!(out, "{}", location.file)?;
            writeln!(out, "{}", location.line)?;
            writeln!(out, "{}", location.column)?;
        }

        previous_location = location.clone();
    }
    Ok(())
}

/// Parse the output of [`show_goto_trace_gui`].
pub fn parse_gui_trace(text: &str) -> TraceResult<Vec<GuiRecord>> {
    let lines: Vec<&str> = text.lines().collect();
    let mut records = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        match lines[i] {
            "" => i += 1,
            "FAILED" => {
                let field = |offset: usize| field_at(&lines, i + offset);
                let comment = field(1)?.to_string();
                let file = field(4)?.to_string();
                let line = number_at(&lines, i + 5)?;
                let column = number_at(&lines, i + 6)?;
                records.push(GuiRecord::Failed {
                    comment,
                    file,
                    line,
                    column,
                });
                i += 7;
            }
            "TRACE" => {
                let header = field_at(&lines, i + 1)?;
                let mut parts = header.splitn(4, ',');
                let mut part = |what: &str| {
                    parts.next().map(str::to_string).ok_or_else(|| TraceError::MalformedGuiTrace {
                        line: i + 2,
                        message: format!("missing {what}"),
                    })
                };
                let identifier = part("identifier")?;
                let base_name = part("base name")?;
                let type_id = part("type id")?;
                let value = part("value")?;
                records.push(GuiRecord::Trace {
                    identifier,
                    base_name,
                    type_id,
                    value,
                    step_nr: number_at(&lines, i + 2)?,
                    file: field_at(&lines, i + 3)?.to_string(),
                    line: number_at(&lines, i + 4)?,
                    column: number_at(&lines, i + 5)?,
                });
                i += 6;
            }
            other => {
                return Err(TraceError::MalformedGuiTrace {
                    line: i + 1,
                    message: format!("expected TRACE or FAILED, found {other:?}"),
                })
            }
        }
    }
    Ok(records)
}

fn field_at<'t>(lines: &[&'t str], index: usize) -> TraceResult<&'t str> {
    lines
        .get(index)
        .copied()
        .ok_or(TraceError::MalformedGuiTrace {
            line: index + 1,
            message: "record is truncated".to_string(),
        })
}

fn number_at(lines: &[&str], index: usize) -> TraceResult<u32> {
    let text = field_at(lines, index)?;
    text.parse().map_err(|_| TraceError::MalformedGuiTrace {
        line: index + 1,
        message: format!("expected a number, found {text:?}"),
    })
}
