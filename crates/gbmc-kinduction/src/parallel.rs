//! Parallel k-induction.
//!
//! Three workers run the base case (from k = 1), the forward condition and
//! the inductive step (both from k = 2). Each sends exactly one
//! [`ResultRecord`] to the coordinator on the forward channel: the k of its
//! conclusive answer, or 0 when it has none. The coordinator can ask the
//! base case, over the backward channel, to stop once it has covered a
//! given k.
//!
//! A proof is only accepted once the base case has finished without a bug
//! up to the proof's k. Once a verdict is reached the cancel flag is raised
//! and the remaining workers are left to wind down on their own.

use crate::checker::{BmcOutcome, BoundedChecker, Strategy};
use crate::config::KInductionConfig;
use crate::{DriverError, DriverResult, Verdict};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Sender of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Process {
    BaseCase,
    ForwardCondition,
    InductiveStep,
    Parent,
}

impl Process {
    fn tag(self) -> u32 {
        match self {
            Process::BaseCase => 0,
            Process::ForwardCondition => 1,
            Process::InductiveStep => 2,
            Process::Parent => 3,
        }
    }

    fn from_tag(tag: u32) -> DriverResult<Self> {
        match tag {
            0 => Ok(Process::BaseCase),
            1 => Ok(Process::ForwardCondition),
            2 => Ok(Process::InductiveStep),
            3 => Ok(Process::Parent),
            _ => Err(DriverError::UnrecognizedWorker { tag }),
        }
    }

    fn strategy(self) -> Option<Strategy> {
        match self {
            Process::BaseCase => Some(Strategy::BaseCase),
            Process::ForwardCondition => Some(Strategy::ForwardCondition),
            Process::InductiveStep => Some(Strategy::InductiveStep),
            Process::Parent => None,
        }
    }

    fn worker_index(self) -> Option<usize> {
        match self {
            Process::Parent => None,
            worker => Some(worker.tag() as usize),
        }
    }
}

/// Fixed-size message exchanged between coordinator and workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultRecord {
    pub process: Process,
    /// Bound of the conclusive answer; 0 when there is none.
    pub k: u32,
}

impl ResultRecord {
    pub const SIZE: usize = 8;

    pub fn new(process: Process, k: u32) -> Self {
        Self { process, k }
    }

    pub fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut bytes = [0; Self::SIZE];
        bytes[..4].copy_from_slice(&self.process.tag().to_le_bytes());
        bytes[4..].copy_from_slice(&self.k.to_le_bytes());
        bytes
    }

    pub fn from_bytes(bytes: [u8; Self::SIZE]) -> DriverResult<Self> {
        let [t0, t1, t2, t3, k0, k1, k2, k3] = bytes;
        Ok(Self {
            process: Process::from_tag(u32::from_le_bytes([t0, t1, t2, t3]))?,
            k: u32::from_le_bytes([k0, k1, k2, k3]),
        })
    }
}

type Record = [u8; ResultRecord::SIZE];

/// What the coordinator knows about one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    Running,
    /// Sent its record.
    Reported(u32),
    /// Ended without a record, or was given up on.
    Dead,
}

impl WorkerState {
    fn is_finished(self) -> bool {
        self != WorkerState::Running
    }

    /// k of a conclusive answer.
    fn solution(self) -> Option<u32> {
        match self {
            WorkerState::Reported(k) if k != 0 => Some(k),
            _ => None,
        }
    }
}

const WORKERS: [Process; 3] = [
    Process::BaseCase,
    Process::ForwardCondition,
    Process::InductiveStep,
];

/// Run the three checks concurrently.
pub fn k_induction_parallel<C: BoundedChecker + 'static>(
    checker: Arc<C>,
    config: &KInductionConfig,
) -> DriverResult<Verdict> {
    let (forward_tx, forward_rx) = mpsc::channel::<Record>();
    let (backward_tx, backward_rx) = mpsc::channel::<Record>();
    let cancel = Arc::new(AtomicBool::new(false));

    let base_case = {
        let worker = Worker::new(Process::BaseCase, &checker, &forward_tx, &cancel, config);
        spawn("gbmc-base-case", move || worker.base_case(backward_rx))?
    };
    let forward_condition = {
        let worker = Worker::new(Process::ForwardCondition, &checker, &forward_tx, &cancel, config);
        spawn("gbmc-forward-condition", move || worker.prover())?
    };
    let inductive_step = {
        let worker = Worker::new(Process::InductiveStep, &checker, &forward_tx, &cancel, config);
        spawn("gbmc-inductive-step", move || worker.prover())?
    };
    drop(forward_tx);

    let mut coordinator = Coordinator {
        states: [WorkerState::Running; 3],
        handles: [base_case, forward_condition, inductive_step],
        forward_rx,
        backward_tx,
        base_case_limit: config.max_k(),
        dont_ignore_dead_worker: config.dont_ignore_dead_worker,
    };
    let result = coordinator.wait(config);

    // Workers still running are abandoned, not joined.
    cancel.store(true, Ordering::Relaxed);
    let verdict = result?;
    info!(?verdict, "parallel k-induction finished");
    Ok(verdict)
}

fn spawn<F>(name: &str, body: F) -> DriverResult<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    Ok(thread::Builder::new().name(name.to_string()).spawn(body)?)
}

struct Coordinator {
    states: [WorkerState; 3],
    handles: [JoinHandle<()>; 3],
    forward_rx: Receiver<Record>,
    backward_tx: Sender<Record>,
    /// Largest k the base case is expected to cover.
    base_case_limit: u32,
    dont_ignore_dead_worker: bool,
}

impl Coordinator {
    fn state(&self, process: Process) -> WorkerState {
        process
            .worker_index()
            .map_or(WorkerState::Dead, |i| self.states[i])
    }

    fn wait(&mut self, config: &KInductionConfig) -> DriverResult<Verdict> {
        while !self.states.iter().all(|s| s.is_finished()) {
            match self.forward_rx.recv_timeout(config.poll_interval) {
                Ok(record) => self.accept(record)?,
                Err(RecvTimeoutError::Timeout) => {}
                // every worker has hung up; liveness checks below settle it
                Err(RecvTimeoutError::Disconnected) => thread::sleep(config.poll_interval),
            }
            self.check_liveness()?;

            if self.state(Process::BaseCase).solution().is_some() {
                break;
            }
            if self.proof().is_some() {
                break;
            }
            self.request_confirmation();
        }
        Ok(self.verdict())
    }

    fn accept(&mut self, bytes: Record) -> DriverResult<()> {
        let record = ResultRecord::from_bytes(bytes)?;
        let Some(index) = record.process.worker_index() else {
            return Err(DriverError::UnrecognizedWorker {
                tag: record.process.tag(),
            });
        };
        debug!(process = ?record.process, k = record.k, "worker reported");
        if self.states[index] == WorkerState::Running {
            self.states[index] = WorkerState::Reported(record.k);
        }
        Ok(())
    }

    /// A worker whose thread ended without a record has died.
    fn check_liveness(&mut self) -> DriverResult<()> {
        for process in WORKERS {
            let Some(index) = process.worker_index() else {
                continue;
            };
            if self.states[index] != WorkerState::Running || !self.handles[index].is_finished() {
                continue;
            }
            // its record, if any, was sent before the thread ended
            while let Ok(record) = self.forward_rx.try_recv() {
                self.accept(record)?;
            }
            if self.states[index] != WorkerState::Running {
                continue;
            }

            warn!(process = ?process, "k-induction worker ended without reporting");
            self.states[index] = WorkerState::Dead;
            if self.dont_ignore_dead_worker {
                for state in &mut self.states {
                    if *state == WorkerState::Running {
                        *state = WorkerState::Dead;
                    }
                }
            }
        }
        Ok(())
    }

    /// A proof the base case has confirmed.
    fn proof(&self) -> Option<(u32, Strategy)> {
        if self.state(Process::BaseCase) != WorkerState::Reported(0) {
            return None;
        }
        [Process::ForwardCondition, Process::InductiveStep]
            .into_iter()
            .find_map(|process| {
                let k = self.state(process).solution()?;
                let strategy = process.strategy()?;
                (k <= self.base_case_limit).then_some((k, strategy))
            })
    }

    /// Ask a still-running base case to stop once it covers the smallest
    /// unconfirmed proof.
    fn request_confirmation(&mut self) {
        if self.state(Process::BaseCase) != WorkerState::Running {
            return;
        }
        let smallest = [Process::ForwardCondition, Process::InductiveStep]
            .into_iter()
            .filter_map(|process| self.state(process).solution())
            .min();
        if let Some(k) = smallest.filter(|k| *k < self.base_case_limit) {
            self.base_case_limit = k;
            info!(k, "asking base case to confirm");
            // a base case that already hung up is caught by the liveness check
            let _ = self
                .backward_tx
                .send(ResultRecord::new(Process::Parent, k).to_bytes());
        }
    }

    fn verdict(&self) -> Verdict {
        if let Some(k) = self.state(Process::BaseCase).solution() {
            info!(k, "bug found by the base case");
            return Verdict::Failed { k };
        }
        if let Some((k, strategy)) = self.proof() {
            info!(k, %strategy, "solution found");
            return Verdict::Successful { k, strategy };
        }
        Verdict::Unknown
    }
}

/// State shared by every worker thread.
struct Worker<C> {
    process: Process,
    checker: Arc<C>,
    forward: Sender<Record>,
    cancel: Arc<AtomicBool>,
    config: KInductionConfig,
}

impl<C: BoundedChecker> Worker<C> {
    fn new(
        process: Process,
        checker: &Arc<C>,
        forward: &Sender<Record>,
        cancel: &Arc<AtomicBool>,
        config: &KInductionConfig,
    ) -> Self {
        Self {
            process,
            checker: Arc::clone(checker),
            forward: forward.clone(),
            cancel: Arc::clone(cancel),
            config: config.clone(),
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn report(&self, k: u32) {
        // the coordinator may already have concluded and gone away
        let _ = self
            .forward
            .send(ResultRecord::new(self.process, k).to_bytes());
        info!(process = ?self.process, k, "k-induction worker finished");
    }

    /// Reports the first k with a violation, or 0.
    fn base_case(self, requests: Receiver<Record>) {
        let increment = self.config.k_step_increment.max(1);
        let mut limit = self.config.max_k();
        let mut k = 1;

        while k <= limit {
            if self.cancelled() {
                return;
            }
            info!(k, strategy = %Strategy::BaseCase, "*** K-Induction Loop Iteration ***");
            match self.checker.check(Strategy::BaseCase, k) {
                Ok(BmcOutcome::PropertyViolated) => return self.report(k),
                Ok(BmcOutcome::Safe) => {}
                Err(err) => {
                    warn!(k, %err, "base case aborted");
                    break;
                }
            }

            loop {
                match requests.try_recv() {
                    Ok(bytes) => match ResultRecord::from_bytes(bytes) {
                        Ok(ResultRecord {
                            process: Process::Parent,
                            k: requested,
                        }) => limit = limit.min(requested),
                        other => warn!(?other, "base case ignored a malformed request"),
                    },
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }

            k = match k.checked_add(increment) {
                Some(next) => next,
                None => break,
            };
        }
        self.report(0);
    }

    /// Forward condition or inductive step: reports the first k with a
    /// proof, or 0.
    fn prover(self) {
        let Some(strategy) = self.process.strategy() else {
            return;
        };
        let disabled = match strategy {
            Strategy::ForwardCondition => self.config.disable_forward_condition,
            Strategy::InductiveStep => self.config.disable_inductive_step,
            Strategy::BaseCase => false,
        };
        if disabled {
            return self.report(0);
        }

        for k in self.config.k_steps(2) {
            if self.cancelled() {
                return;
            }
            info!(k, %strategy, "*** K-Induction Loop Iteration ***");
            match self.checker.check(strategy, k) {
                Ok(BmcOutcome::Safe) => return self.report(k),
                Ok(BmcOutcome::PropertyViolated) => {}
                Err(err) => {
                    warn!(k, %strategy, %err, "worker aborted");
                    break;
                }
            }
        }
        self.report(0);
    }
}
