// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request/response correlation bridge.
//!
//! Many concurrent callers share one sequential [`BackendWorker`]:
//!
//! ```text
//!  submit ─► registry.allocate ─► outbound queue ─► BackendWorker ─► TaskStore
//!    ▲                                                   │
//!    │                                                   ▼
//!    └──── oneshot ◄── registry.deliver ◄── InboundCollector ◄── outcomes
//! ```
//!
//! Each caller waits on a one-shot channel registered under its own token, so
//! there is no shared result map to poll. A caller that times out or is dropped
//! cleans up after itself through [`InFlight`]; if its operation had already
//! been enqueued, the collector disposes of the late outcome.

pub mod collector;
pub mod operation;
pub mod registry;
pub mod worker;

pub use self::collector::InboundCollector;
pub use self::operation::{CorrelationToken, Operation, OperationKind, OperationTag, Outcome};
pub use self::registry::{CorrelationRegistry, Delivery};
pub use self::worker::BackendWorker;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, mpsc};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, instrument, warn};

use crate::error::{BridgeError, CorrelationError};
use crate::persistence::TaskStore;
use crate::task::TaskRequest;

/// Tuning for the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// How long a caller waits for its outcome, including time spent waiting
    /// for a free token and queue space.
    pub request_timeout: Duration,
    /// Bound of the outbound queue (and of the outcome channel).
    pub queue_capacity: usize,
    /// Maximum number of outstanding tokens.
    pub max_in_flight: usize,
    /// Tokens are drawn from `0..token_space`.
    pub token_space: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            queue_capacity: 1024,
            max_in_flight: 1024,
            token_space: u64::MAX,
        }
    }
}

struct BridgeInner {
    registry: Arc<CorrelationRegistry>,
    outbound: mpsc::Sender<Operation>,
    request_timeout: Duration,
}

/// Caller-side handle to the bridge.
///
/// Cheap to clone; every clone submits into the same worker.
#[derive(Clone)]
pub struct Bridge {
    inner: Arc<BridgeInner>,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("request_timeout", &self.inner.request_timeout)
            .field("outstanding", &self.inner.registry.outstanding())
            .finish()
    }
}

/// Handles of the worker and collector tasks behind a [`Bridge`].
pub struct BridgeTasks {
    worker: JoinHandle<()>,
    collector: JoinHandle<()>,
    shutdown: Arc<Notify>,
}

impl BridgeTasks {
    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Whether both tasks are still running.
    pub fn is_running(&self) -> bool {
        !self.worker.is_finished() && !self.collector.is_finished()
    }

    /// Stop the worker after it drains the queue, then wait for the collector.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        self.shutdown.notify_one();
        self.worker.await?;
        self.collector.await?;
        Ok(())
    }
}

/// Start the backend worker and inbound collector for `store`.
///
/// Must be called from within a tokio runtime.
pub fn spawn(store: Arc<dyn TaskStore>, config: &BridgeConfig) -> (Bridge, BridgeTasks) {
    let capacity = config.queue_capacity.max(1);
    let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
    let (outcome_tx, outcome_rx) = mpsc::channel(capacity);

    let registry = Arc::new(CorrelationRegistry::new(
        config.max_in_flight,
        config.token_space,
    ));
    let shutdown = Arc::new(Notify::new());

    let worker = BackendWorker::new(store, outbound_rx, outcome_tx, shutdown.clone());
    let collector = InboundCollector::new(outcome_rx, registry.clone());

    let tasks = BridgeTasks {
        worker: tokio::spawn(worker.run()),
        collector: tokio::spawn(collector.run()),
        shutdown,
    };

    info!(
        queue_capacity = capacity,
        max_in_flight = config.max_in_flight,
        request_timeout_ms = config.request_timeout.as_millis() as u64,
        "Bridge started"
    );

    let bridge = Bridge {
        inner: Arc::new(BridgeInner {
            registry,
            outbound: outbound_tx,
            request_timeout: config.request_timeout,
        }),
    };

    (bridge, tasks)
}

impl Bridge {
    /// Submit a request and wait for its outcome.
    ///
    /// Invalid requests are rejected with [`BridgeError::Validation`] before a
    /// token is allocated. A failed store call is not an error here: it comes
    /// back as an [`Outcome`] with `success == false`.
    #[instrument(skip(self, request), fields(operation = %request.tag()))]
    pub async fn submit(&self, request: TaskRequest) -> Result<Outcome, BridgeError> {
        let kind = request.into_operation().inspect_err(|e| {
            debug!(error = %e, "Request rejected before entering the bridge");
        })?;
        let tag = kind.tag();
        let timeout = self.inner.request_timeout;

        match tokio::time::timeout(timeout, self.round_trip(kind)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Request timed out waiting for its outcome"
                );
                Err(BridgeError::Timeout {
                    operation: tag,
                    after: timeout,
                })
            }
        }
    }

    async fn round_trip(&self, kind: OperationKind) -> Result<Outcome, BridgeError> {
        let registry = self.inner.registry.as_ref();
        let (token, reply) = registry.allocate().await?;
        let mut in_flight = InFlight::new(registry, token);

        let permit = self
            .inner
            .outbound
            .reserve()
            .await
            .map_err(|_| BridgeError::Closed)?;
        permit.send(Operation { token, kind });
        in_flight.enqueued = true;
        debug!(%token, "Operation enqueued");

        let outcome = reply.await.map_err(|_| BridgeError::Closed)?;
        in_flight.claim()?;

        if outcome.token != token {
            return Err(CorrelationError::Mismatch {
                expected: token,
                actual: outcome.token,
            }
            .into());
        }

        debug!(%token, success = outcome.success, "Outcome claimed");
        Ok(outcome)
    }

    /// Number of tokens currently outstanding.
    pub fn outstanding(&self) -> usize {
        self.inner.registry.outstanding()
    }

    /// Number of delivered outcomes not yet claimed.
    pub fn unclaimed(&self) -> usize {
        self.inner.registry.unclaimed()
    }

    /// Whether the bridge stopped accepting requests.
    pub fn is_closed(&self) -> bool {
        self.inner.registry.is_closed() || self.inner.outbound.is_closed()
    }

    /// The configured per-request timeout.
    pub fn request_timeout(&self) -> Duration {
        self.inner.request_timeout
    }
}

/// Cleanup guard for one allocated token.
///
/// Dropped unclaimed (timeout, client gone, error), it releases the token if
/// the operation never reached the queue and abandons it otherwise.
struct InFlight<'a> {
    registry: &'a CorrelationRegistry,
    token: CorrelationToken,
    enqueued: bool,
    claimed: bool,
}

impl<'a> InFlight<'a> {
    fn new(registry: &'a CorrelationRegistry, token: CorrelationToken) -> Self {
        Self {
            registry,
            token,
            enqueued: false,
            claimed: false,
        }
    }

    fn claim(&mut self) -> Result<(), BridgeError> {
        self.claimed = true;
        self.registry.release(self.token)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.claimed {
            return;
        }
        if self.enqueued {
            self.registry.abandon(self.token);
        } else {
            let _ = self.registry.release(self.token);
        }
    }
}
