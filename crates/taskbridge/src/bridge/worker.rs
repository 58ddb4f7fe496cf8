// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Backend worker.
//!
//! The single consumer of the outbound queue. Operations are executed one at a
//! time, in queue order, and every dequeued operation yields exactly one
//! [`Outcome`], whether the store call succeeds, fails, or panics.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Notify, mpsc};
use tracing::{debug, error, info, warn};

use crate::error::StoreError;
use crate::persistence::TaskStore;
use crate::task::TaskRecord;

use super::operation::{Operation, OperationKind, Outcome};

/// Sequential executor of store operations.
pub struct BackendWorker {
    store: Arc<dyn TaskStore>,
    operations: mpsc::Receiver<Operation>,
    outcomes: mpsc::Sender<Outcome>,
    shutdown: Arc<Notify>,
}

impl BackendWorker {
    /// Create a worker draining `operations` and emitting on `outcomes`.
    pub fn new(
        store: Arc<dyn TaskStore>,
        operations: mpsc::Receiver<Operation>,
        outcomes: mpsc::Sender<Outcome>,
        shutdown: Arc<Notify>,
    ) -> Self {
        Self {
            store,
            operations,
            outcomes,
            shutdown,
        }
    }

    /// Run the worker loop.
    ///
    /// On shutdown the outbound queue is closed to new operations and whatever
    /// is already queued is still executed, so every enqueued caller gets an
    /// outcome. The loop also ends when every sender is gone or the outcome
    /// channel closes.
    pub async fn run(mut self) {
        info!("Backend worker started");

        let mut processed = 0u64;
        let mut draining = false;

        loop {
            let operation = tokio::select! {
                biased;

                _ = self.shutdown.notified(), if !draining => {
                    info!("Backend worker received shutdown signal, draining queue");
                    draining = true;
                    self.operations.close();
                    continue;
                }

                next = self.operations.recv() => match next {
                    Some(operation) => operation,
                    None => break,
                },
            };

            let outcome = execute(&self.store, operation).await;
            processed += 1;

            if self.outcomes.send(outcome).await.is_err() {
                error!("Outcome channel closed, backend worker stopping");
                break;
            }
        }

        info!(processed, "Backend worker stopped");
    }
}

/// Execute one operation and wrap the result in an [`Outcome`].
///
/// The store call runs on its own task so that a panic inside a store
/// implementation surfaces as a failed outcome instead of killing the worker.
pub async fn execute(store: &Arc<dyn TaskStore>, operation: Operation) -> Outcome {
    let Operation { token, kind } = operation;
    let tag = kind.tag();

    let store = Arc::clone(store);
    let call = tokio::spawn(async move { call_store(store.as_ref(), kind).await });

    match call.await {
        Ok(Ok(tasks)) => {
            debug!(%token, operation = %tag, records = tasks.len(), "Operation succeeded");
            Outcome::success(token, tasks)
        }
        Ok(Err(e)) => {
            warn!(
                %token,
                operation = %tag,
                code = e.error_code(),
                error = %e,
                "Store call failed"
            );
            Outcome::failure(token)
        }
        Err(e) => {
            error!(%token, operation = %tag, error = %e, "Store call panicked");
            Outcome::failure(token)
        }
    }
}

async fn call_store(
    store: &dyn TaskStore,
    kind: OperationKind,
) -> Result<Vec<TaskRecord>, StoreError> {
    match kind {
        OperationKind::Create { title, description } => store
            .create_task(&title, &description)
            .await
            .map(|task| vec![task]),
        OperationKind::Read => store.list_tasks().await,
        OperationKind::Update {
            id,
            title,
            description,
            status,
        } => store
            .update_task(id, &title, &description, status, Utc::now())
            .await
            .map(|task| vec![task]),
        OperationKind::Delete { id } => store.delete_task(id).await.map(|()| Vec::new()),
    }
}
