// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! taskbridge server
//!
//! Serves the task HTTP API through the correlation bridge.

use anyhow::Result;
use tracing::{error, info};

use taskbridge::config::Config;
use taskbridge::persistence;
use taskbridge::runtime::TaskBridgeRuntime;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from crate directory or parent directories)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("taskbridge=info".parse()?),
        )
        .init();

    info!("Starting taskbridge");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;

    info!(
        http_addr = %config.http_addr,
        request_timeout_ms = config.bridge.request_timeout.as_millis() as u64,
        queue_capacity = config.bridge.queue_capacity,
        max_in_flight = config.bridge.max_in_flight,
        "Configuration loaded"
    );

    // Connect to database and run migrations
    info!("Connecting to database...");
    let store = persistence::connect(&config.database_url).await.map_err(|e| {
        error!("Database error: {}", e);
        e
    })?;
    info!("Database ready");

    let runtime = TaskBridgeRuntime::builder()
        .store(store)
        .bridge_config(config.bridge)
        .http_addr(config.http_addr)
        .build()?
        .start()
        .await?;

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");

    runtime.shutdown().await?;
    info!("Shutdown complete");

    Ok(())
}
