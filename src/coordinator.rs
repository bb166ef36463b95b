//! Runs one timed injection: partitions the request budget, brings every
//! worker to Ready, starts the clock, releases them together and stops the
//! clock once the last Done arrives.

use std::num::NonZeroUsize;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::barrier::{self, CoordinatorSignals};
use crate::error::{Error, Result};
use crate::model::{RequestTemplate, RunConfig, RunResult, WorkAssignment, WorkerReport};
use crate::transport::Transport;
use crate::worker::worker;

/// Splits `total` requests over `workers` workers.
///
/// Worker `i` takes `remaining / (workers - i)` of what is left, so shares
/// differ by at most one and always add up to `total`.
pub fn partition(total: u64, workers: NonZeroUsize) -> Vec<WorkAssignment> {
    let workers = workers.get();
    let mut remaining = total;
    (0..workers)
        .map(|index| {
            let iterations = remaining / (workers - index) as u64;
            remaining -= iterations;
            WorkAssignment { index, iterations }
        })
        .collect()
}

pub struct Coordinator<T> {
    config: RunConfig,
    template: Arc<RequestTemplate>,
    transport: Arc<T>,
}

impl<T: Transport> Coordinator<T> {
    pub fn new(config: RunConfig, template: RequestTemplate, transport: T) -> Self {
        Self::with_shared(config, Arc::new(template), Arc::new(transport))
    }

    pub fn with_shared(
        config: RunConfig,
        template: Arc<RequestTemplate>,
        transport: Arc<T>,
    ) -> Self {
        Self {
            config,
            template,
            transport,
        }
    }

    pub async fn run(self) -> Result<RunResult> {
        let requested = self.config.requests;
        let assignments = partition(requested, self.config.concurrency);
        let (mut signals, worker_signals) = barrier::channels(assignments.len());

        let pb = if self.config.show_progress {
            ProgressBar::new(requested).with_style(ProgressStyle::with_template(
                "{spinner} {wide_bar} {pos}/{len} {per_sec}",
            )?)
        } else {
            ProgressBar::hidden()
        };

        let mut set = JoinSet::new();
        for (assignment, worker_signals) in assignments.into_iter().zip(worker_signals) {
            set.spawn(worker(
                assignment,
                Arc::clone(&self.template),
                Arc::clone(&self.transport),
                worker_signals,
                pb.clone(),
            ));
        }

        tracing::debug!(
            workers = signals.expected(),
            requests = requested,
            "waiting for workers"
        );
        collect_ready(&mut signals, &mut set).await?;

        let begin = Instant::now();
        signals.start();
        tracing::debug!("workers released");

        let reports = collect_done(&mut signals, &mut set).await?;
        let elapsed = begin.elapsed();
        pb.finish_and_clear();

        while let Some(res) = set.join_next().await {
            res?;
        }

        let result = RunResult::new(requested, elapsed, reports);
        tracing::debug!(
            elapsed_ms = result.elapsed().as_millis() as u64,
            completed = result.completed(),
            failed_workers = result.failed_workers().count(),
            "run finished"
        );
        Ok(result)
    }
}

/// Waits for a Ready signal from every worker.
///
/// A worker task that panics before every Ready has arrived fails the phase
/// at once; dropping the set then aborts the workers still parked on Start.
async fn collect_ready(signals: &mut CoordinatorSignals, set: &mut JoinSet<()>) -> Result<()> {
    let expected = signals.expected();
    let mut received = 0;
    while received < expected {
        tokio::select! {
            Some(index) = signals.next_ready() => {
                tracing::trace!(worker = index, "worker ready");
                received += 1;
            }
            Some(res) = set.join_next() => res?,
            else => {
                return Err(Error::Barrier {
                    phase: "ready",
                    received,
                    expected,
                })
            }
        }
    }
    Ok(())
}

/// Collects one Done report per worker, failing as soon as a worker task panics.
async fn collect_done(
    signals: &mut CoordinatorSignals,
    set: &mut JoinSet<()>,
) -> Result<Vec<WorkerReport>> {
    let expected = signals.expected();
    let mut reports = Vec::with_capacity(expected);
    while reports.len() < expected {
        tokio::select! {
            Some(report) = signals.next_done() => reports.push(report),
            Some(res) = set.join_next() => res?,
            else => {
                return Err(Error::Barrier {
                    phase: "done",
                    received: reports.len(),
                    expected,
                })
            }
        }
    }
    Ok(reports)
}
