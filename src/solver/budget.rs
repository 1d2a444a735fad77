use crate::config::SolveConfig;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Cooperative cancellation shared between a caller and a running solve.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Iteration, wall-clock and cancellation bounds for the slot search.
#[derive(Debug)]
pub(crate) struct SolveBudget {
    max_iterations: u64,
    deadline: Option<Instant>,
    cancel: Option<CancelFlag>,
    spent: u64,
    exhausted: bool,
}

impl SolveBudget {
    pub(crate) fn new(config: &SolveConfig, cancel: Option<CancelFlag>) -> Self {
        let deadline = (config.time_limit_ms > 0)
            .then(|| Instant::now() + Duration::from_millis(config.time_limit_ms));
        Self {
            max_iterations: config.max_iterations,
            deadline,
            cancel,
            spent: 0,
            exhausted: false,
        }
    }

    /// Spends one slot check. Returns `false` once any bound is hit.
    pub(crate) fn tick(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        self.spent += 1;
        let over_iterations = self.max_iterations > 0 && self.spent > self.max_iterations;
        let over_time = self.deadline.is_some_and(|deadline| Instant::now() >= deadline);
        let cancelled = self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled);
        if over_iterations || over_time || cancelled {
            self.exhausted = true;
            self.spent -= 1;
            return false;
        }
        true
    }

    pub(crate) fn spent(&self) -> u64 {
        self.spent
    }
}
