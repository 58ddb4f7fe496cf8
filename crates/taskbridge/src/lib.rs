// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! taskbridge - Request/Response Correlation Bridge for a Task Store
//!
//! Many concurrent callers (HTTP handlers, or any embedding code) share one
//! sequential backend worker that owns the task store. Every request is tagged
//! with a correlation token, queued, executed in order, and its outcome routed
//! back to exactly the caller that submitted it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         HTTP clients                                     │
//! │              GET/POST /tasks, PUT/DELETE /tasks/{id}                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      http (axum handlers)                                │
//! │                  one Bridge::submit per request                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌───────────────────────┐  Operation  ┌────────────────┐   ┌────────────┐
//! │        Bridge         │────────────►│ BackendWorker  │──►│ TaskStore  │
//! │ CorrelationRegistry   │  (bounded)  │  (sequential)  │   │ PG/SQLite  │
//! └───────────────────────┘             └────────────────┘   └────────────┘
//!           ▲                                    │
//!           │ oneshot per token                  │ Outcome
//!           │                                    ▼
//! ┌───────────────────────┐            ┌─────────────────────┐
//! │   waiting caller      │◄───────────│  InboundCollector   │
//! └───────────────────────┘            └─────────────────────┘
//! ```
//!
//! # Guarantees
//!
//! - No two outstanding requests share a token, even when the token space is
//!   smaller than the number of callers.
//! - A caller only ever receives the outcome produced for its own request.
//! - Operations reach the store in the order they were enqueued.
//! - A failed or panicking store call yields `success = false` for that
//!   request only.
//! - Outstanding tokens and unclaimed outcomes are bounded, and a caller that
//!   times out or goes away leaves nothing behind.
//!
//! # Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `TASKBRIDGE_DATABASE_URL` | Yes* | - | PostgreSQL or `sqlite:` connection string |
//! | `TASKBRIDGE_DB_HOST` / `_USER` / `_NAME` | Yes* | - | PostgreSQL URL parts |
//! | `TASKBRIDGE_DB_PASSWORD` | No | empty | PostgreSQL password |
//! | `TASKBRIDGE_DB_PORT` | No | `5432` | PostgreSQL port |
//! | `TASKBRIDGE_HTTP_PORT` | No | `8080` | HTTP server port |
//! | `TASKBRIDGE_REQUEST_TIMEOUT_MS` | No | `5000` | Per-request timeout |
//! | `TASKBRIDGE_QUEUE_CAPACITY` | No | `1024` | Outbound queue bound |
//! | `TASKBRIDGE_MAX_IN_FLIGHT` | No | `1024` | Maximum outstanding requests |
//!
//! \* Either the full URL or the host/user/name parts.
//!
//! # Modules
//!
//! - [`bridge`]: Correlation registry, backend worker, inbound collector
//! - [`config`]: Server configuration from environment variables
//! - [`error`]: Error types with error code mapping
//! - [`persistence`]: Task store trait with PostgreSQL and SQLite backends
//! - [`runtime`]: Embeddable runtime
//! - [`task`]: Task records, statuses and requests
//! - `http`: HTTP API (feature `http`)

#![deny(missing_docs)]

/// Request/response correlation between callers and the backend worker.
pub mod bridge;

/// Server configuration loaded from environment variables.
pub mod config;

/// Error types for bridge and store operations.
pub mod error;

/// HTTP API in front of the bridge.
#[cfg(feature = "http")]
pub mod http;

/// Embedded database migrations.
pub mod migrations;

/// Task store trait and its backends.
pub mod persistence;

/// Embeddable runtime.
pub mod runtime;

/// Task domain types.
pub mod task;

pub use bridge::{Bridge, BridgeConfig};
pub use error::{BridgeError, CorrelationError, StoreError};
pub use persistence::TaskStore;
pub use runtime::TaskBridgeRuntime;
pub use task::{TaskRecord, TaskRequest, TaskStatus};
