//! Internal consistency errors raised by program passes.
//!
//! None of these are user errors: they mean an upstream pass produced a
//! malformed program. Callers treat them as fatal.

use crate::instruction::InstrId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GotoError {
    #[error("copy_from: target {target} not found")]
    DanglingTarget { target: InstrId },

    #[error("instruction {instruction} refers to target {target} which has no target number")]
    UnnumberedTarget { instruction: InstrId, target: InstrId },

    #[error("instruction {0} does not belong to this program")]
    NotInProgram(InstrId),

    #[error("failed to find `{name}' in function_map")]
    MissingFunction { name: String },

    #[error("backwards goto {instruction} has {count} targets, expected exactly one")]
    MalformedBackEdge { instruction: InstrId, count: usize },

    #[error("loop head at location {location_number} is not a numbered target")]
    UnknownLoopHead { location_number: u32 },
}

/// Result type for program passes.
pub type GotoResult<T> = Result<T, GotoError>;
