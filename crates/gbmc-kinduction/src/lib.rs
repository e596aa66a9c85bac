//! k-induction driver.
//!
//! Combines three bounded checks into an unbounded verdict:
//!
//! - **base case**: a property violation within k unwindings is a real bug.
//! - **forward condition**: if k unwindings cover every reachable state and
//!   the base case found nothing, the program is safe.
//! - **inductive step**: if the property is k-inductive and the base case
//!   found nothing, the program is safe.
//!
//! [`sequential`] runs the checks in turn for growing k. [`parallel`] runs
//! each check in its own worker thread and lets the first conclusive answer
//! decide.

pub mod checker;
pub mod config;
pub mod parallel;
pub mod sequential;

pub use checker::{BmcOutcome, BoundedChecker, CheckerError, Strategy};
pub use config::KInductionConfig;
pub use parallel::{k_induction_parallel, Process, ResultRecord};
pub use sequential::{falsification, incremental, k_induction};

use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Checker(#[from] CheckerError),

    #[error("message from unrecognized k-induction worker (tag {tag})")]
    UnrecognizedWorker { tag: u32 },

    #[error("failed to start k-induction worker: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type DriverResult<T> = Result<T, DriverError>;

/// Final answer of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The base case found a violation.
    Failed { k: u32 },
    /// Proved by the forward condition or the inductive step.
    Successful { k: u32, strategy: Strategy },
    /// Neither proved nor falsified within the configured bound.
    Unknown,
}

impl Verdict {
    /// The customary final status line.
    pub fn status(&self) -> &'static str {
        match self {
            Verdict::Failed { .. } => "VERIFICATION FAILED",
            Verdict::Successful { .. } => "VERIFICATION SUCCESSFUL",
            Verdict::Unknown => "VERIFICATION UNKNOWN",
        }
    }
}

/// Driver mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    KInduction,
    KInductionParallel,
    Falsification,
    Incremental,
}

/// Run the driver in the given mode.
pub fn run<C: BoundedChecker + 'static>(
    mode: Mode,
    checker: Arc<C>,
    config: &KInductionConfig,
) -> DriverResult<Verdict> {
    match mode {
        Mode::KInduction => k_induction(checker.as_ref(), config),
        Mode::KInductionParallel => k_induction_parallel(checker, config),
        Mode::Falsification => falsification(checker.as_ref(), config),
        Mode::Incremental => incremental(checker.as_ref(), config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysSafe;

    impl BoundedChecker for AlwaysSafe {
        fn check(&self, strategy: Strategy, _k: u32) -> Result<BmcOutcome, CheckerError> {
            Ok(match strategy {
                Strategy::BaseCase => BmcOutcome::Safe,
                _ => BmcOutcome::PropertyViolated,
            })
        }
    }

    #[test]
    fn test_status_lines() {
        assert_eq!(Verdict::Failed { k: 1 }.status(), "VERIFICATION FAILED");
        assert_eq!(Verdict::Unknown.status(), "VERIFICATION UNKNOWN");
    }

    #[test]
    fn test_run_modes_without_conclusion() {
        let config = KInductionConfig {
            max_k_step: 3,
            poll_interval: std::time::Duration::from_millis(1),
            ..Default::default()
        };
        let checker = Arc::new(AlwaysSafe);
        for mode in [
            Mode::KInduction,
            Mode::KInductionParallel,
            Mode::Falsification,
            Mode::Incremental,
        ] {
            assert_eq!(run(mode, Arc::clone(&checker), &config).unwrap(), Verdict::Unknown);
        }
    }
}
