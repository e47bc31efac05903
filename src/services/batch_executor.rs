//! Batched task executor with fail-fast semantics.
//!
//! Units run in consecutive fixed-size batches. Every unit of a batch is
//! polled concurrently on the calling task and all of them settle before the
//! next batch starts. A batch containing any failure ends the run; side
//! effects of units that already succeeded are left in place.

use std::future::Future;
use std::path::PathBuf;

use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::domain::errors::DomainResult;
use crate::domain::models::config::DEFAULT_PARALLELISM;
use crate::domain::models::{BatchOutcome, UnitFailure};

/// Something the executor can name in logs and failure reports.
pub trait WorkUnit {
    fn label(&self) -> String;
}

impl WorkUnit for PathBuf {
    fn label(&self) -> String {
        self.file_name()
            .map_or_else(|| self.display().to_string(), |n| n.to_string_lossy().into_owned())
    }
}

impl WorkUnit for String {
    fn label(&self) -> String {
        self.clone()
    }
}

impl WorkUnit for usize {
    fn label(&self) -> String {
        format!("unit-{self}")
    }
}

/// Progress events emitted during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    Started {
        step: String,
        total: usize,
        batch_count: usize,
    },
    BatchStarted {
        batch_number: usize,
        size: usize,
    },
    UnitSettled {
        index: usize,
        label: String,
        success: bool,
    },
    BatchSettled {
        batch_number: usize,
        succeeded: usize,
        failed: usize,
    },
    Finished {
        outcome: BatchOutcome,
    },
}

/// Runs independent async units in fail-fast batches.
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    step: String,
    concurrency: usize,
    events: Option<mpsc::UnboundedSender<BatchEvent>>,
}

impl BatchExecutor {
    /// `concurrency` below 1 is treated as 1.
    pub fn new(step: impl Into<String>, concurrency: usize) -> Self {
        Self {
            step: step.into(),
            concurrency: concurrency.max(1),
            events: None,
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: mpsc::UnboundedSender<BatchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    /// Execute `units` in batches of `concurrency`.
    ///
    /// `execute` resolves to `Ok(true)` on success, `Ok(false)` on a logical
    /// failure and `Err(_)` on a fault; both of the latter abort the run once
    /// the current batch has settled. `completed` counts successes in every
    /// batch that ran, including the aborting one.
    pub async fn run<U, F, Fut>(&self, units: Vec<U>, execute: F) -> BatchOutcome
    where
        U: WorkUnit,
        F: Fn(U) -> Fut,
        Fut: Future<Output = DomainResult<bool>>,
    {
        let total = units.len();
        let batch_count = total.div_ceil(self.concurrency);
        let mut outcome = BatchOutcome {
            total,
            ..BatchOutcome::default()
        };

        info!(step = %self.step, total, batch_count, concurrency = self.concurrency, "starting batched run");
        self.emit(BatchEvent::Started {
            step: self.step.clone(),
            total,
            batch_count,
        });

        let mut remaining = units.into_iter().enumerate().peekable();
        while remaining.peek().is_some() {
            let batch: Vec<(usize, U)> = remaining.by_ref().take(self.concurrency).collect();
            let batch_number = outcome.batches_run + 1;
            debug!(step = %self.step, batch_number, size = batch.len(), "batch started");
            self.emit(BatchEvent::BatchStarted {
                batch_number,
                size: batch.len(),
            });

            let pending = batch.into_iter().map(|(index, unit)| {
                let label = unit.label();
                let fut = execute(unit);
                async move { (index, label, fut.await) }
            });
            let settled = join_all(pending).await;
            outcome.batches_run = batch_number;

            let mut succeeded = 0;
            let mut failed = 0;
            for (index, label, result) in settled {
                let failure = match result {
                    Ok(true) => None,
                    Ok(false) => Some("unit reported failure".to_string()),
                    Err(e) => Some(e.to_string()),
                };
                self.emit(BatchEvent::UnitSettled {
                    index,
                    label: label.clone(),
                    success: failure.is_none(),
                });
                match failure {
                    None => succeeded += 1,
                    Some(message) => {
                        warn!(step = %self.step, unit = %label, error = %message, "unit failed");
                        failed += 1;
                        outcome.failures.push(UnitFailure {
                            index,
                            label,
                            message,
                        });
                    }
                }
            }
            outcome.completed += succeeded;
            self.emit(BatchEvent::BatchSettled {
                batch_number,
                succeeded,
                failed,
            });

            if failed > 0 {
                outcome.aborted = true;
                warn!(
                    step = %self.step,
                    batch_number,
                    completed = outcome.completed,
                    total,
                    "aborting run after failed batch"
                );
                break;
            }
        }

        if !outcome.aborted {
            info!(step = %self.step, completed = outcome.completed, total, "batched run finished");
        }
        self.emit(BatchEvent::Finished {
            outcome: outcome.clone(),
        });
        outcome
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new("batch", DEFAULT_PARALLELISM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_all_units_succeed_in_ceil_batches() {
        let executor = BatchExecutor::new("test", 3);
        let outcome = executor
            .run((0..7).collect::<Vec<usize>>(), |_| async { Ok(true) })
            .await;

        assert_eq!(outcome.total, 7);
        assert_eq!(outcome.completed, 7);
        assert_eq!(outcome.batches_run, 3);
        assert!(!outcome.aborted);
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_empty_input() {
        let outcome = BatchExecutor::new("test", 3)
            .run(Vec::<usize>::new(), |_| async { Ok(true) })
            .await;
        assert_eq!(outcome.batches_run, 0);
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_fail_fast_counts_successes_through_failing_batch() {
        let started = Arc::new(Mutex::new(Vec::new()));
        let executor = BatchExecutor::new("test", 3);

        let outcome = executor
            .run((0..9).collect::<Vec<usize>>(), |i| {
                let started = Arc::clone(&started);
                async move {
                    started.lock().unwrap().push(i);
                    Ok(i != 4)
                }
            })
            .await;

        assert!(outcome.aborted);
        assert_eq!(outcome.batches_run, 2);
        // batch 1 (0,1,2) plus 3 and 5 from batch 2
        assert_eq!(outcome.completed, 5);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].index, 4);
        let mut seen = started.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_fault_aborts_like_failure() {
        let outcome = BatchExecutor::new("test", 2)
            .run((0..4).collect::<Vec<usize>>(), |i| async move {
                if i == 0 {
                    Err(DomainError::Configuration("boom".to_string()))
                } else {
                    Ok(true)
                }
            })
            .await;

        assert!(outcome.aborted);
        assert_eq!(outcome.completed, 1);
        assert!(outcome.failures[0].message.contains("boom"));
    }

    #[tokio::test]
    async fn test_batch_runs_concurrently_and_never_exceeds_width() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let outcome = BatchExecutor::new("test", 4)
            .run((0..10).collect::<Vec<usize>>(), |_| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(true)
                }
            })
            .await;

        assert_eq!(outcome.completed, 10);
        assert_eq!(peak.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_clamped() {
        let executor = BatchExecutor::new("test", 0);
        assert_eq!(executor.concurrency(), 1);
        let outcome = executor
            .run((0..3).collect::<Vec<usize>>(), |_| async { Ok(true) })
            .await;
        assert_eq!(outcome.batches_run, 3);
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let executor = BatchExecutor::new("events", 2).with_events(tx);
        executor
            .run((0..3).collect::<Vec<usize>>(), |_| async { Ok(true) })
            .await;
        drop(executor);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert!(matches!(
            events.first(),
            Some(BatchEvent::Started {
                total: 3,
                batch_count: 2,
                ..
            })
        ));
        let settled = events
            .iter()
            .filter(|e| matches!(e, BatchEvent::UnitSettled { success: true, .. }))
            .count();
        assert_eq!(settled, 3);
        assert!(matches!(events.last(), Some(BatchEvent::Finished { .. })));
    }
}
