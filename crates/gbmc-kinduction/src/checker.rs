//! The bounded checker the driver coordinates.

use std::fmt;
use thiserror::Error;

/// Which of the three k-induction checks to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Is a property violated within k unwindings?
    BaseCase,
    /// Are all reachable states covered by k unwindings?
    ForwardCondition,
    /// Does the property hold after k steps from any state where it held
    /// for the previous k?
    InductiveStep,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::BaseCase => "base case",
            Strategy::ForwardCondition => "forward condition",
            Strategy::InductiveStep => "inductive step",
        };
        f.write_str(name)
    }
}

/// Result of one bounded check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BmcOutcome {
    /// The solver found a model for the negated claims.
    PropertyViolated,
    /// No violation within the bound.
    Safe,
}

#[derive(Debug, Error)]
pub enum CheckerError {
    /// The program uses something this strategy cannot handle, such as
    /// dynamic allocation in the inductive step.
    #[error("{strategy} is not applicable: {reason}")]
    Unsupported { strategy: Strategy, reason: String },

    #[error("{strategy} failed at k = {k}: {message}")]
    Failed {
        strategy: Strategy,
        k: u32,
        message: String,
    },
}

/// A bounded model checker that can run each strategy at a given k.
///
/// Parallel mode calls the checker from three threads at once.
pub trait BoundedChecker: Send + Sync {
    fn check(&self, strategy: Strategy, k: u32) -> Result<BmcOutcome, CheckerError>;
}

impl<C: BoundedChecker + ?Sized> BoundedChecker for std::sync::Arc<C> {
    fn check(&self, strategy: Strategy, k: u32) -> Result<BmcOutcome, CheckerError> {
        (**self).check(strategy, k)
    }
}

impl<C: BoundedChecker + ?Sized> BoundedChecker for &C {
    fn check(&self, strategy: Strategy, k: u32) -> Result<BmcOutcome, CheckerError> {
        (**self).check(strategy, k)
    }
}
