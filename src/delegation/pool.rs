//! Bounded-concurrency job execution.
//!
//! A fixed set of `min(max_parallel, job_count)` scoped worker threads pulls
//! job indexes from a shared atomic cursor (first-available scheduling).
//! Workers check the cancel signal both before claiming an index and before
//! starting execution, so a fired signal stops new starts without aborting
//! in-flight work. Work items are known upfront, which is why a shared
//! cursor suffices and no queue is needed.
//!
//! Outcomes are reported positionally: the result list always has the same
//! length and order as the input, regardless of completion order.

use crate::cancel::CancelToken;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Terminal outcome for one job slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome<T> {
    /// The callback returned a value.
    Completed(T),
    /// The callback returned an error; captured per-slot, never propagated
    /// to sibling workers.
    Failed(String),
    /// Never claimed because the cancel signal fired first.
    Skipped,
}

/// Result of draining one job list.
#[derive(Debug)]
pub struct PoolResult<T> {
    /// Whether the cancel signal was observed at any point.
    pub cancelled: bool,
    /// One outcome per input job, in input order.
    pub outcomes: Vec<JobOutcome<T>>,
}

/// Execute `jobs` with at most `max_parallel` concurrent callback
/// invocations, returning once all workers have drained.
pub fn run_jobs<J, T, F>(
    jobs: &[J],
    max_parallel: usize,
    cancel: &CancelToken,
    run_job: F,
) -> PoolResult<T>
where
    J: Sync,
    T: Send,
    F: Fn(usize, &J) -> Result<T, String> + Sync,
{
    let worker_count = max_parallel.max(1).min(jobs.len());
    let cursor = AtomicUsize::new(0);
    let outcomes: Vec<Mutex<JobOutcome<T>>> =
        jobs.iter().map(|_| Mutex::new(JobOutcome::Skipped)).collect();

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            scope.spawn(|| {
                loop {
                    if cancel.is_cancelled() {
                        return;
                    }

                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    if index >= jobs.len() {
                        return;
                    }

                    // The signal may have fired between claim and start.
                    if cancel.is_cancelled() {
                        return;
                    }

                    let outcome = match run_job(index, &jobs[index]) {
                        Ok(value) => JobOutcome::Completed(value),
                        Err(message) => JobOutcome::Failed(message),
                    };
                    *outcomes[index].lock().unwrap_or_else(|p| p.into_inner()) = outcome;
                }
            });
        }
    });

    PoolResult {
        cancelled: cancel.is_cancelled(),
        outcomes: outcomes
            .into_iter()
            .map(|slot| slot.into_inner().unwrap_or_else(|p| p.into_inner()))
            .collect(),
    }
}
