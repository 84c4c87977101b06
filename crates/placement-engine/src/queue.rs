//! Background sync queue
//!
//! Reconciliation runs as a fire-and-forget task: the status-update path
//! dispatches the contract id and returns immediately, a pool of workers
//! drains the queue and drives the engine. The channel is bounded so a
//! misbehaving trigger source saturates visibly instead of growing without
//! limit.

use crate::reconcile::ReconciliationEngine;
use parking_lot::Mutex;
use placement_model::ContractId;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Dispatch failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// Queue is at capacity; the item was not accepted
    #[error("sync queue full, contract {0} not enqueued")]
    QueueFull(ContractId),

    /// Queue was shut down
    #[error("sync queue closed")]
    Closed,
}

/// Queue statistics snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueStats {
    /// Items accepted for processing
    pub dispatched: usize,
    /// Items fully processed (success or recorded failure)
    pub processed: usize,
    /// Items whose engine run returned an error
    pub errored: usize,
}

#[derive(Debug, Default)]
struct Counters {
    dispatched: AtomicUsize,
    processed: AtomicUsize,
    errored: AtomicUsize,
}

/// Bounded background queue feeding the reconciliation engine
pub struct SyncQueue {
    sender: Mutex<Option<mpsc::Sender<ContractId>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl SyncQueue {
    /// Start the queue with `worker_count` consumers
    ///
    /// Each worker loops on the shared receiver and invokes
    /// [`ReconciliationEngine::on_contract_active`]; engine errors are
    /// logged, never re-raised.
    #[must_use]
    pub fn start(
        engine: Arc<ReconciliationEngine>,
        capacity: usize,
        worker_count: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<ContractId>(capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let counters = Arc::new(Counters::default());

        let mut workers = Vec::with_capacity(worker_count.max(1));
        for worker in 0..worker_count.max(1) {
            let rx = rx.clone();
            let engine = engine.clone();
            let counters = counters.clone();
            workers.push(tokio::spawn(async move {
                loop {
                    let next = { rx.lock().await.recv().await };
                    let Some(contract_id) = next else {
                        break;
                    };
                    match engine.on_contract_active(contract_id).await {
                        Ok(report) => {
                            counters.processed.fetch_add(1, Ordering::Relaxed);
                            tracing::debug!(
                                worker,
                                contract = %contract_id,
                                disposition = ?report.disposition,
                                "background reconciliation done"
                            );
                        }
                        Err(err) => {
                            counters.errored.fetch_add(1, Ordering::Relaxed);
                            tracing::error!(
                                worker,
                                contract = %contract_id,
                                error = %err,
                                "background reconciliation errored"
                            );
                        }
                    }
                }
                tracing::debug!(worker, "sync worker stopped");
            }));
        }

        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            counters,
        }
    }

    /// Enqueue a contract for background reconciliation
    ///
    /// Never blocks: a full queue is reported to the caller and logged.
    ///
    /// # Errors
    /// - `QueueFull` when the channel is at capacity
    /// - `Closed` after shutdown
    pub fn dispatch(&self, contract_id: ContractId) -> Result<(), DispatchError> {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            return Err(DispatchError::Closed);
        };
        match sender.try_send(contract_id) {
            Ok(()) => {
                self.counters.dispatched.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(id)) => {
                tracing::warn!(contract = %id, "sync queue saturated");
                Err(DispatchError::QueueFull(id))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DispatchError::Closed),
        }
    }

    /// Close the queue and wait for the workers to drain it
    pub async fn shutdown(&self) {
        let sender = self.sender.lock().take();
        drop(sender);

        let handles: Vec<JoinHandle<()>> = {
            let mut workers = self.workers.lock();
            workers.drain(..).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
        tracing::info!("sync queue shut down");
    }

    /// Get queue statistics
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            dispatched: self.counters.dispatched.load(Ordering::Relaxed),
            processed: self.counters.processed.load(Ordering::Relaxed),
            errored: self.counters.errored.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for SyncQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncQueue")
            .field("stats", &self.stats())
            .finish()
    }
}
