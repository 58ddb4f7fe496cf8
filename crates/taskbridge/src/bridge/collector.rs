// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Inbound collector.
//!
//! Drains the worker's outcomes and hands each one to the registry slot of its
//! token. Slots of callers that gave up are freed here; everything else is
//! left for the claiming caller.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::operation::Outcome;
use super::registry::{CorrelationRegistry, Delivery};

/// Routes outcomes from the backend worker to waiting callers.
pub struct InboundCollector {
    outcomes: mpsc::Receiver<Outcome>,
    registry: Arc<CorrelationRegistry>,
}

impl InboundCollector {
    /// Create a collector feeding `registry`.
    pub fn new(outcomes: mpsc::Receiver<Outcome>, registry: Arc<CorrelationRegistry>) -> Self {
        Self { outcomes, registry }
    }

    /// Run until the worker drops its end of the outcome channel, then close
    /// the registry so nobody waits on an outcome that will never come.
    pub async fn run(mut self) {
        info!("Inbound collector started");

        let mut delivered = 0u64;
        while let Some(outcome) = self.outcomes.recv().await {
            let token = outcome.token;
            match self.registry.deliver(outcome) {
                Delivery::Delivered => {
                    delivered += 1;
                    debug!(%token, "Outcome delivered");
                }
                Delivery::Discarded => {
                    debug!(%token, "Discarded late outcome of an abandoned request");
                }
                Delivery::Unknown => {
                    warn!(%token, "Dropping outcome for a token that is not outstanding");
                }
                Delivery::Duplicate => {
                    warn!(%token, "Dropping duplicate outcome");
                }
            }
        }

        self.registry.close();
        info!(delivered, "Inbound collector stopped");
    }
}
