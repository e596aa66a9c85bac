//! Single-threaded drivers: k-induction, falsification and incremental BMC.

use crate::checker::{BmcOutcome, BoundedChecker, Strategy};
use crate::config::KInductionConfig;
use crate::{DriverResult, Verdict};
use tracing::{info, warn};

/// For each k: base case, then forward condition, then (for k > 1) the
/// inductive step.
pub fn k_induction<C: BoundedChecker + ?Sized>(
    checker: &C,
    config: &KInductionConfig,
) -> DriverResult<Verdict> {
    for k in config.k_steps(1) {
        info!(k, "*** K-Induction Loop Iteration ***");

        if let Some(verdict) = base_case(checker, k)? {
            return Ok(verdict);
        }
        if let Some(verdict) = forward_condition(checker, config, k)? {
            return Ok(verdict);
        }
        if let Some(verdict) = inductive_step(checker, config, k) {
            return Ok(verdict);
        }
    }

    info!("unable to prove or falsify the program, giving up");
    Ok(Verdict::Unknown)
}

/// Base case only: look for bugs with growing k.
pub fn falsification<C: BoundedChecker + ?Sized>(
    checker: &C,
    config: &KInductionConfig,
) -> DriverResult<Verdict> {
    for k in config.k_steps(1) {
        info!(k, "*** Iteration number ***");
        if let Some(verdict) = base_case(checker, k)? {
            return Ok(verdict);
        }
    }
    info!("unable to prove or falsify the program, giving up");
    Ok(Verdict::Unknown)
}

/// Base case and forward condition with growing k.
pub fn incremental<C: BoundedChecker + ?Sized>(
    checker: &C,
    config: &KInductionConfig,
) -> DriverResult<Verdict> {
    for k in config.k_steps(1) {
        info!(k, "*** Iteration number ***");
        if let Some(verdict) = base_case(checker, k)? {
            return Ok(verdict);
        }
        if let Some(verdict) = forward_condition(checker, config, k)? {
            return Ok(verdict);
        }
    }
    info!("unable to prove or falsify the program, giving up");
    Ok(Verdict::Unknown)
}

fn base_case<C: BoundedChecker + ?Sized>(checker: &C, k: u32) -> DriverResult<Option<Verdict>> {
    info!(k, strategy = %Strategy::BaseCase, "checking");
    match checker.check(Strategy::BaseCase, k)? {
        BmcOutcome::PropertyViolated => {
            info!(k, "bug found");
            Ok(Some(Verdict::Failed { k }))
        }
        BmcOutcome::Safe => Ok(None),
    }
}

fn forward_condition<C: BoundedChecker + ?Sized>(
    checker: &C,
    config: &KInductionConfig,
    k: u32,
) -> DriverResult<Option<Verdict>> {
    if config.disable_forward_condition {
        return Ok(None);
    }
    info!(k, strategy = %Strategy::ForwardCondition, "checking");
    match checker.check(Strategy::ForwardCondition, k)? {
        BmcOutcome::Safe => {
            info!(k, "solution found by the forward condition; all states are reachable");
            Ok(Some(Verdict::Successful {
                k,
                strategy: Strategy::ForwardCondition,
            }))
        }
        BmcOutcome::PropertyViolated => Ok(None),
    }
}

/// Errors only disable the inductive step for this k.
fn inductive_step<C: BoundedChecker + ?Sized>(
    checker: &C,
    config: &KInductionConfig,
    k: u32,
) -> Option<Verdict> {
    if k == 1 || config.disable_inductive_step {
        return None;
    }
    info!(k, strategy = %Strategy::InductiveStep, "checking");
    match checker.check(Strategy::InductiveStep, k) {
        Ok(BmcOutcome::Safe) => {
            info!(k, "solution found by the inductive step");
            Some(Verdict::Successful {
                k,
                strategy: Strategy::InductiveStep,
            })
        }
        Ok(BmcOutcome::PropertyViolated) => None,
        Err(err) => {
            warn!(k, %err, "inductive step disabled for this k");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::CheckerError;
    use crate::DriverError;
    use std::sync::Mutex;

    /// Proves or falsifies at fixed bounds and records every call.
    #[derive(Default)]
    struct Scripted {
        bug_at: Option<u32>,
        forward_at: Option<u32>,
        inductive_at: Option<u32>,
        inductive_error: bool,
        calls: Mutex<Vec<(Strategy, u32)>>,
    }

    impl BoundedChecker for Scripted {
        fn check(&self, strategy: Strategy, k: u32) -> Result<BmcOutcome, CheckerError> {
            self.calls.lock().unwrap().push((strategy, k));
            let reached = |bound: Option<u32>| bound.is_some_and(|b| k >= b);
            match strategy {
                Strategy::BaseCase if reached(self.bug_at) => Ok(BmcOutcome::PropertyViolated),
                Strategy::BaseCase => Ok(BmcOutcome::Safe),
                Strategy::ForwardCondition if reached(self.forward_at) => Ok(BmcOutcome::Safe),
                Strategy::ForwardCondition => Ok(BmcOutcome::PropertyViolated),
                Strategy::InductiveStep if self.inductive_error => Err(CheckerError::Unsupported {
                    strategy,
                    reason: "dynamic allocation".to_string(),
                }),
                Strategy::InductiveStep if reached(self.inductive_at) => Ok(BmcOutcome::Safe),
                Strategy::InductiveStep => Ok(BmcOutcome::PropertyViolated),
            }
        }
    }

    fn config(max: u32) -> KInductionConfig {
        KInductionConfig {
            max_k_step: max,
            ..Default::default()
        }
    }

    #[test]
    fn test_order_of_checks() {
        let checker = Scripted {
            inductive_at: Some(2),
            ..Default::default()
        };
        let verdict = k_induction(&checker, &config(10)).unwrap();
        assert_eq!(
            verdict,
            Verdict::Successful {
                k: 2,
                strategy: Strategy::InductiveStep
            }
        );
        assert_eq!(
            *checker.calls.lock().unwrap(),
            [
                (Strategy::BaseCase, 1),
                (Strategy::ForwardCondition, 1),
                (Strategy::BaseCase, 2),
                (Strategy::ForwardCondition, 2),
                (Strategy::InductiveStep, 2),
            ]
        );
    }

    #[test]
    fn test_bug_beats_proof_at_same_k() {
        let checker = Scripted {
            bug_at: Some(3),
            forward_at: Some(3),
            ..Default::default()
        };
        assert_eq!(k_induction(&checker, &config(10)).unwrap(), Verdict::Failed { k: 3 });
    }

    #[test]
    fn test_forward_condition_proof() {
        let checker = Scripted {
            forward_at: Some(4),
            ..Default::default()
        };
        assert_eq!(
            k_induction(&checker, &config(10)).unwrap(),
            Verdict::Successful {
                k: 4,
                strategy: Strategy::ForwardCondition
            }
        );
    }

    #[test]
    fn test_disabled_checks() {
        let checker = Scripted {
            forward_at: Some(1),
            inductive_at: Some(2),
            ..Default::default()
        };
        let config = KInductionConfig {
            disable_forward_condition: true,
            disable_inductive_step: true,
            ..config(5)
        };
        assert_eq!(k_induction(&checker, &config).unwrap(), Verdict::Unknown);
        assert!(checker
            .calls
            .lock()
            .unwrap()
            .iter()
            .all(|(s, _)| *s == Strategy::BaseCase));
    }

    #[test]
    fn test_inductive_error_is_not_fatal() {
        let checker = Scripted {
            inductive_error: true,
            bug_at: Some(4),
            ..Default::default()
        };
        assert_eq!(k_induction(&checker, &config(10)).unwrap(), Verdict::Failed { k: 4 });
    }

    #[test]
    fn test_base_case_error_is_fatal() {
        struct Broken;
        impl BoundedChecker for Broken {
            fn check(&self, strategy: Strategy, k: u32) -> Result<BmcOutcome, CheckerError> {
                Err(CheckerError::Failed {
                    strategy,
                    k,
                    message: "solver crashed".to_string(),
                })
            }
        }
        assert!(matches!(
            k_induction(&Broken, &config(3)),
            Err(DriverError::Checker(CheckerError::Failed { k: 1, .. }))
        ));
    }

    #[test]
    fn test_falsification_and_incremental() {
        let checker = Scripted {
            forward_at: Some(2),
            ..Default::default()
        };
        assert_eq!(falsification(&checker, &config(4)).unwrap(), Verdict::Unknown);
        assert_eq!(
            incremental(&checker, &config(4)).unwrap(),
            Verdict::Successful {
                k: 2,
                strategy: Strategy::ForwardCondition
            }
        );

        let buggy = Scripted {
            bug_at: Some(3),
            ..Default::default()
        };
        assert_eq!(falsification(&buggy, &config(4)).unwrap(), Verdict::Failed { k: 3 });
    }
}
