//! GOTO programs: the control-flow representation every later stage walks.
//!
//! A [`GotoProgram`] is an ordered list of [`Instruction`]s whose jump
//! targets are stable [`InstrId`] handles. [`GotoFunctions`] holds the
//! bodies of a whole program, and [`GotoLoops`] slices loops out of one
//! function for the k-induction transformation.

pub mod error;
pub mod functions;
pub mod instruction;
pub mod loops;
pub mod output;
pub mod program;

pub use error::{GotoError, GotoResult};
pub use functions::{GotoFunction, GotoFunctions};
pub use instruction::{InstrId, Instruction, InstructionKind, InstructionType, NO_TARGET_NUMBER};
pub use loops::{GotoLoops, Loop};
pub use output::OutputOptions;
pub use program::GotoProgram;
