//! Ready / Start / Done signalling between the coordinator and its workers.
//!
//! A fresh set of channels is created for every run. Each worker owns one
//! [`WorkerSignals`] and fires each of its three signals at most once; the
//! coordinator owns the matching [`CoordinatorSignals`].

use tokio::sync::{mpsc, oneshot};

use crate::model::WorkerReport;

pub fn channels(workers: usize) -> (CoordinatorSignals, Vec<WorkerSignals>) {
    let (ready_tx, ready_rx) = mpsc::channel(workers.max(1));
    let (done_tx, done_rx) = mpsc::channel(workers.max(1));

    let mut start_txs = Vec::with_capacity(workers);
    let mut worker_signals = Vec::with_capacity(workers);
    for index in 0..workers {
        let (start_tx, start_rx) = oneshot::channel();
        start_txs.push(start_tx);
        worker_signals.push(WorkerSignals {
            index,
            ready: ready_tx.clone(),
            start: start_rx,
            done: done_tx.clone(),
        });
    }

    let coordinator = CoordinatorSignals {
        expected: workers,
        ready: ready_rx,
        start: start_txs,
        done: done_rx,
    };
    (coordinator, worker_signals)
}

#[derive(Debug)]
pub struct CoordinatorSignals {
    expected: usize,
    ready: mpsc::Receiver<usize>,
    start: Vec<oneshot::Sender<()>>,
    done: mpsc::Receiver<WorkerReport>,
}

impl CoordinatorSignals {
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Receives the next Ready signal, or `None` once every worker has
    /// dropped its signals. Cancel safe.
    pub async fn next_ready(&mut self) -> Option<usize> {
        self.ready.recv().await
    }

    /// Releases every worker. Workers that are already gone are skipped.
    pub fn start(&mut self) {
        for start in self.start.drain(..) {
            let _ = start.send(());
        }
    }

    /// Receives the next Done report, with the same `None` and cancel
    /// safety as [`next_ready`](Self::next_ready).
    pub async fn next_done(&mut self) -> Option<WorkerReport> {
        self.done.recv().await
    }
}

#[derive(Debug)]
pub struct WorkerSignals {
    index: usize,
    ready: mpsc::Sender<usize>,
    start: oneshot::Receiver<()>,
    done: mpsc::Sender<WorkerReport>,
}

impl WorkerSignals {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Signals Ready, then suspends until the coordinator signals Start.
    ///
    /// Returns `false` if the coordinator went away instead of starting the run.
    pub async fn ready_and_wait(&mut self) -> bool {
        if self.ready.send(self.index).await.is_err() {
            return false;
        }
        (&mut self.start).await.is_ok()
    }

    /// Signals Done, handing the report to the coordinator.
    pub async fn done(self, report: WorkerReport) {
        if self.done.send(report).await.is_err() {
            tracing::debug!(worker = self.index, "coordinator gone before done signal");
        }
    }
}
