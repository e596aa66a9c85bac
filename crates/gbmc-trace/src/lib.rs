//! Counterexample traces and their renderings.
//!
//! A [`GotoTrace`] is filled by a symbolic executor, one [`TraceStep`] at a
//! time. It can then be shown as a human-readable report
//! ([`show_goto_trace`]), as line records for GUI front ends
//! ([`show_goto_trace_gui`]), or as a GraphML violation witness
//! ([`WitnessGenerator`]).

pub mod error;
pub mod gui;
pub mod printf;
pub mod show;
pub mod step;
pub mod tokenizer;
pub mod witness;

pub use error::{TraceError, TraceResult, WitnessError, WitnessResult};
pub use gui::{parse_gui_trace, show_goto_trace_gui, GuiRecord};
pub use printf::{printf_format, PrintfFormatter};
pub use show::{counterexample_value, show_goto_trace, show_state_header};
pub use step::{GotoTrace, StepKind, TraceStep};
pub use tokenizer::{map_tokens_by_line, tokenize, tokenize_file, CToken, TokenMap};
pub use witness::{
    generate_goto_trace_in_graphml_format, Witness, WitnessConfig, WitnessEdge, WitnessGenerator,
    WitnessNode,
};
