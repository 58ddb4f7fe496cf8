// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Correlation registry.
//!
//! Tracks every outstanding [`CorrelationToken`] together with the one-shot
//! channel its caller is waiting on. A slot moves through three stages:
//!
//! ```text
//!   allocate ──► Waiting ──deliver──► Delivered ──release──► (freed)
//!                   │                     │
//!                abandon               abandon
//!                   ▼                     ▼
//!               Abandoned ──deliver──► (freed)          (freed)
//! ```
//!
//! Each slot owns an in-flight permit, so the number of slots (and the memory
//! they hold) never exceeds the configured bound, and a token is only reissued
//! after its slot is gone.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{OwnedSemaphorePermit, Semaphore, oneshot};
use tracing::{debug, warn};

use crate::error::{BridgeError, CorrelationError};

use super::operation::{CorrelationToken, Outcome};

/// What happened to an outcome handed to [`CorrelationRegistry::deliver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the waiting caller.
    Delivered,
    /// The caller had given up; the outcome was dropped and the token freed.
    Discarded,
    /// No slot exists for the token.
    Unknown,
    /// An outcome for this token was already delivered and not yet claimed.
    Duplicate,
}

enum Stage {
    Waiting(oneshot::Sender<Outcome>),
    Delivered,
    Abandoned,
}

struct Slot {
    stage: Stage,
    _permit: OwnedSemaphorePermit,
}

struct RegistryState {
    next: u64,
    slots: HashMap<CorrelationToken, Slot>,
    closed: bool,
}

/// Issues unique in-flight tokens and routes outcomes to their waiters.
pub struct CorrelationRegistry {
    state: Mutex<RegistryState>,
    permits: Arc<Semaphore>,
    token_space: u64,
}

impl CorrelationRegistry {
    /// Create a registry.
    ///
    /// Tokens are drawn from `0..token_space`. At most
    /// `min(max_in_flight, token_space)` tokens are outstanding at once; further
    /// allocations wait for a slot to free up.
    pub fn new(max_in_flight: usize, token_space: u64) -> Self {
        let token_space = token_space.max(1);
        let capacity = max_in_flight
            .clamp(1, Semaphore::MAX_PERMITS)
            .min(usize::try_from(token_space).unwrap_or(usize::MAX));

        Self {
            state: Mutex::new(RegistryState {
                next: 0,
                slots: HashMap::new(),
                closed: false,
            }),
            permits: Arc::new(Semaphore::new(capacity)),
            token_space,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate a token and the receiver its outcome will arrive on.
    ///
    /// Waits while the registry is at capacity. Candidate selection and
    /// insertion happen under one lock acquisition, so two concurrent callers
    /// can never be issued the same token.
    pub async fn allocate(
        &self,
    ) -> Result<(CorrelationToken, oneshot::Receiver<Outcome>), BridgeError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| BridgeError::Closed)?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let mut state = self.lock();
        if state.closed {
            return Err(BridgeError::Closed);
        }

        // With our permit held there are fewer than `token_space` slots, so one
        // of the next `outstanding + 1` consecutive candidates is free.
        let outstanding = state.slots.len();
        for _ in 0..=outstanding {
            let token = CorrelationToken::new(state.next);
            state.next = (state.next + 1) % self.token_space;

            if let Entry::Vacant(vacant) = state.slots.entry(token) {
                vacant.insert(Slot {
                    stage: Stage::Waiting(reply_tx),
                    _permit: permit,
                });
                return Ok((token, reply_rx));
            }
        }

        Err(CorrelationError::Exhausted { outstanding }.into())
    }

    /// Hand an outcome to the caller waiting on its token.
    pub fn deliver(&self, outcome: Outcome) -> Delivery {
        let token = outcome.token;
        let mut state = self.lock();
        let Some(slot) = state.slots.get_mut(&token) else {
            return Delivery::Unknown;
        };

        match std::mem::replace(&mut slot.stage, Stage::Delivered) {
            Stage::Waiting(reply) => {
                // A dropped receiver means the caller is mid-cleanup; its
                // abandon() will find the slot delivered and free it.
                let _ = reply.send(outcome);
                Delivery::Delivered
            }
            Stage::Delivered => Delivery::Duplicate,
            Stage::Abandoned => {
                state.slots.remove(&token);
                Delivery::Discarded
            }
        }
    }

    /// Free a token after its outcome was claimed, or before its operation was
    /// ever enqueued.
    ///
    /// Releasing a token that is not outstanding changes nothing and is reported
    /// as [`CorrelationError::UnknownToken`].
    pub fn release(&self, token: CorrelationToken) -> Result<(), BridgeError> {
        let removed = self.lock().slots.remove(&token);
        match removed {
            Some(_) => Ok(()),
            None => {
                warn!(%token, "Release of a token that is not outstanding");
                Err(CorrelationError::UnknownToken(token).into())
            }
        }
    }

    /// Give up on a token whose operation is already enqueued.
    ///
    /// If the outcome has not arrived yet the slot stays reserved until the
    /// collector disposes of it; otherwise it is freed right away.
    pub fn abandon(&self, token: CorrelationToken) {
        let mut state = self.lock();
        let waiting = match state.slots.get(&token) {
            Some(slot) => matches!(slot.stage, Stage::Waiting(_)),
            None => return,
        };

        if waiting {
            if let Some(slot) = state.slots.get_mut(&token) {
                slot.stage = Stage::Abandoned;
            }
            debug!(%token, "Token abandoned before its outcome arrived");
        } else {
            state.slots.remove(&token);
            debug!(%token, "Token abandoned after delivery, freed");
        }
    }

    /// Stop issuing tokens and fail every caller still waiting.
    ///
    /// Delivered-but-unclaimed outcomes stay until their callers claim them.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state
            .slots
            .retain(|_, slot| matches!(slot.stage, Stage::Delivered));
        self.permits.close();
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of tokens currently outstanding.
    pub fn outstanding(&self) -> usize {
        self.lock().slots.len()
    }

    /// Number of delivered outcomes not yet claimed.
    pub fn unclaimed(&self) -> usize {
        self.lock()
            .slots
            .values()
            .filter(|slot| matches!(slot.stage, Stage::Delivered))
            .count()
    }
}
