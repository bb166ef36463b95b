use std::sync::Arc;

use indicatif::ProgressBar;

use crate::barrier::WorkerSignals;
use crate::error::WorkerFailure;
use crate::model::{RequestTemplate, WorkAssignment, WorkerReport};
use crate::transport::Transport;

/// Runs one worker through setup, the Ready/Start handshake, its request loop
/// and the final Done signal.
///
/// Done is sent on every path, including failed setup, a transport error and
/// a coordinator that never started the run.
pub async fn worker<T: Transport>(
    assignment: WorkAssignment,
    template: Arc<RequestTemplate>,
    transport: Arc<T>,
    mut signals: WorkerSignals,
    pb: ProgressBar,
) {
    let mut report = WorkerReport::new(assignment);

    let request = match transport.prepare(&template).await {
        Ok(request) => Some(request),
        Err(e) => {
            tracing::warn!(worker = assignment.index, error = %e, "request setup failed");
            report.failure = Some(WorkerFailure::Setup(e));
            None
        }
    };

    if !signals.ready_and_wait().await {
        tracing::debug!(worker = assignment.index, "run abandoned before start");
        signals.done(report).await;
        return;
    }

    if let Some(request) = request {
        for ite in 0..assignment.iterations {
            report.issued += 1;
            pb.inc(1);
            let exchange = match transport.execute(&request).await {
                Ok(exchange) => exchange,
                Err(e) => {
                    tracing::warn!(
                        worker = assignment.index,
                        iteration = ite,
                        error = %e,
                        "request failed, worker stopping"
                    );
                    report.failure = Some(WorkerFailure::Request {
                        iteration: ite,
                        source: e,
                    });
                    break;
                }
            };

            report.completed += 1;
            report.bytes_received += exchange.body_bytes;
            if !exchange.is_success() {
                report.non_success += 1;
            }
        }
    }

    tracing::debug!(
        worker = assignment.index,
        assigned = report.assigned,
        completed = report.completed,
        failed = report.is_failed(),
        "worker finished"
    );
    signals.done(report).await;
}
