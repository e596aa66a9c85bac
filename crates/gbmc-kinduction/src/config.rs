//! Driver configuration.

use std::time::Duration;

/// Configuration for the k-induction driver.
#[derive(Debug, Clone)]
pub struct KInductionConfig {
    /// Largest k to try (default: 50).
    pub max_k_step: u32,
    /// Step between successive values of k (default: 1).
    pub k_step_increment: u32,
    /// Ignore `max_k_step` and keep going up to `u32::MAX`.
    pub unlimited_k_steps: bool,
    pub disable_forward_condition: bool,
    pub disable_inductive_step: bool,
    /// Treat a worker that dies without reporting as the end of the whole run.
    pub dont_ignore_dead_worker: bool,
    /// How long the parallel coordinator waits for a record before
    /// re-checking worker liveness.
    pub poll_interval: Duration,
}

impl Default for KInductionConfig {
    fn default() -> Self {
        Self {
            max_k_step: 50,
            k_step_increment: 1,
            unlimited_k_steps: false,
            disable_forward_condition: false,
            disable_inductive_step: false,
            dont_ignore_dead_worker: false,
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl KInductionConfig {
    pub fn max_k(&self) -> u32 {
        if self.unlimited_k_steps {
            u32::MAX
        } else {
            self.max_k_step
        }
    }

    /// `start`, `start + increment`, ... up to [`max_k`](Self::max_k).
    /// An increment of zero is treated as one.
    pub fn k_steps(&self, start: u32) -> impl Iterator<Item = u32> {
        let increment = self.k_step_increment.max(1);
        let max = self.max_k();
        std::iter::successors(Some(start), move |k| k.checked_add(increment))
            .take_while(move |k| *k <= max)
    }
}
