// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP API in front of the bridge.
//!
//! | Method | Path | Handler |
//! |--------|------|---------|
//! | `GET` | `/tasks` | [`handlers::list_tasks`] |
//! | `POST` | `/tasks` | [`handlers::create_task`] |
//! | `PUT` | `/tasks/{id}` | [`handlers::update_task`] |
//! | `DELETE` | `/tasks/{id}` | [`handlers::delete_task`] |
//! | `GET` | `/health` | [`handlers::health`] |

pub mod dto;
pub mod error;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use axum::Router;
use axum::routing::{get, put};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::bridge::Bridge;

/// Shared state for HTTP handlers.
#[derive(Debug, Clone)]
pub struct HttpState {
    /// Bridge every handler submits into.
    pub bridge: Bridge,
    /// When the server started (for uptime calculation).
    pub start_time: Instant,
}

impl HttpState {
    /// Create handler state around `bridge`.
    pub fn new(bridge: Bridge) -> Self {
        Self {
            bridge,
            start_time: Instant::now(),
        }
    }
}

/// Build the router.
pub fn router(bridge: Bridge) -> Router {
    Router::new()
        .route(
            "/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/tasks/{id}",
            put(handlers::update_task).delete(handlers::delete_task),
        )
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(HttpState::new(bridge))
}

/// Serve the API on `listener` until `shutdown` is notified.
pub async fn serve(listener: TcpListener, bridge: Bridge, shutdown: Arc<Notify>) -> Result<()> {
    info!(addr = %listener.local_addr()?, "HTTP server starting");

    axum::serve(listener, router(bridge))
        .with_graceful_shutdown(async move { shutdown.notified().await })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
