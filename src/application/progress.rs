//! Progress forwarding
//!
//! Progress callbacks are invoked from the indexing task and must not block
//! it, so reports go through a bounded channel drained by a forwarder task.
//! When the consumer falls behind, newer reports win and intermediate ones
//! are dropped.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::domain::types::{IndexPhase, IndexProgress};

/// Callback receiving progress reports.
pub type ProgressCallback = Arc<dyn Fn(IndexProgress) + Send + Sync>;

const QUEUE_DEPTH: usize = 64;

/// Non-blocking progress reporter bound to one indexing run.
pub struct ProgressReporter {
    tx: Option<mpsc::Sender<IndexProgress>>,
}

impl ProgressReporter {
    /// Create a reporter; with no callback every report is a no-op.
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        let tx = callback.map(|callback| {
            let (tx, mut rx) = mpsc::channel::<IndexProgress>(QUEUE_DEPTH);
            tokio::spawn(async move {
                while let Some(progress) = rx.recv().await {
                    callback(progress);
                }
            });
            tx
        });
        Self { tx }
    }

    /// Enqueue a report without blocking; drops the report when the queue
    /// is full.
    pub fn report(&self, phase: IndexPhase, current: usize, total: usize, percentage: u8) {
        if let Some(tx) = &self.tx {
            let progress = IndexProgress {
                phase,
                current,
                total,
                percentage,
            };
            if tx.try_send(progress).is_err() {
                tracing::trace!("progress queue full, dropping report");
            }
        }
    }
}
