//! Trace and witness errors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    #[error("step number {step} follows step number {previous}")]
    NonMonotonicStep { previous: u32, step: u32 },

    #[error("GUI trace line {line}: {message}")]
    MalformedGuiTrace { line: usize, message: String },
}

pub type TraceResult<T> = Result<T, TraceError>;

#[derive(Debug, Error)]
pub enum WitnessError {
    #[error("cannot write witness to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type WitnessResult<T> = Result<T, WitnessError>;
