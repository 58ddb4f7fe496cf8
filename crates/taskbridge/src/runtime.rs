// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for taskbridge.
//!
//! This module provides [`TaskBridgeRuntime`] which allows embedding the bridge
//! (and, with the `http` feature, its HTTP API) into an existing tokio
//! application instead of running the standalone server.
//!
//! # Example
//!
//! ```rust,ignore
//! use taskbridge::persistence::SqliteTaskStore;
//! use taskbridge::runtime::TaskBridgeRuntime;
//! use taskbridge::task::TaskRequest;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = SqliteTaskStore::connect("sqlite::memory:").await?;
//!
//!     let runtime = TaskBridgeRuntime::builder()
//!         .store(std::sync::Arc::new(store))
//!         .http_addr("127.0.0.1:8080".parse()?)
//!         .build()?
//!         .start()
//!         .await?;
//!
//!     runtime.bridge().submit(TaskRequest::Read).await?;
//!
//!     // Graceful shutdown
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

#[cfg(feature = "http")]
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
#[cfg(feature = "http")]
use tokio::sync::Notify;
#[cfg(feature = "http")]
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::bridge::{self, Bridge, BridgeConfig, BridgeTasks};
use crate::persistence::TaskStore;

/// Builder for creating a [`TaskBridgeRuntime`].
#[derive(Default)]
pub struct TaskBridgeRuntimeBuilder {
    store: Option<Arc<dyn TaskStore>>,
    bridge_config: BridgeConfig,
    #[cfg(feature = "http")]
    http_addr: Option<SocketAddr>,
}

impl std::fmt::Debug for TaskBridgeRuntimeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("TaskBridgeRuntimeBuilder");
        s.field("store", &self.store.as_ref().map(|_| "..."))
            .field("bridge_config", &self.bridge_config);
        #[cfg(feature = "http")]
        s.field("http_addr", &self.http_addr);
        s.finish()
    }
}

impl TaskBridgeRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the task store (required).
    pub fn store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the bridge tuning.
    ///
    /// Default: [`BridgeConfig::default`]
    pub fn bridge_config(mut self, config: BridgeConfig) -> Self {
        self.bridge_config = config;
        self
    }

    /// Serve the HTTP API on `addr`. Without this the runtime runs the
    /// bridge only.
    #[cfg(feature = "http")]
    pub fn http_addr(mut self, addr: SocketAddr) -> Self {
        self.http_addr = Some(addr);
        self
    }

    /// Build the runtime configuration.
    ///
    /// Returns an error if required fields are missing or the bridge
    /// tuning is unusable.
    pub fn build(self) -> Result<TaskBridgeRuntimeConfig> {
        let store = self
            .store
            .ok_or_else(|| anyhow::anyhow!("store is required"))?;

        if self.bridge_config.max_in_flight == 0 {
            anyhow::bail!("max_in_flight must be at least 1");
        }
        if self.bridge_config.token_space == 0 {
            anyhow::bail!("token_space must be at least 1");
        }

        Ok(TaskBridgeRuntimeConfig {
            store,
            bridge_config: self.bridge_config,
            #[cfg(feature = "http")]
            http_addr: self.http_addr,
        })
    }
}

/// Configuration for a [`TaskBridgeRuntime`].
pub struct TaskBridgeRuntimeConfig {
    store: Arc<dyn TaskStore>,
    bridge_config: BridgeConfig,
    #[cfg(feature = "http")]
    http_addr: Option<SocketAddr>,
}

impl std::fmt::Debug for TaskBridgeRuntimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskBridgeRuntimeConfig")
            .field("store", &"...")
            .field("bridge_config", &self.bridge_config)
            .finish_non_exhaustive()
    }
}

impl TaskBridgeRuntimeConfig {
    /// Start the runtime: spawn the bridge tasks and, if an HTTP address
    /// was configured, bind it and spawn the server.
    pub async fn start(self) -> Result<TaskBridgeRuntime> {
        let (bridge, tasks) = bridge::spawn(self.store, &self.bridge_config);

        #[cfg(feature = "http")]
        let http = match self.http_addr {
            Some(addr) => {
                let listener = match tokio::net::TcpListener::bind(addr).await {
                    Ok(listener) => listener,
                    Err(e) => {
                        // Don't leave the bridge running behind a failed start.
                        let _ = tasks.shutdown().await;
                        return Err(e.into());
                    }
                };
                let local_addr = listener.local_addr()?;
                let shutdown = Arc::new(Notify::new());
                let handle = tokio::spawn(crate::http::serve(
                    listener,
                    bridge.clone(),
                    shutdown.clone(),
                ));
                Some(HttpServer {
                    handle,
                    shutdown,
                    local_addr,
                })
            }
            None => None,
        };

        info!("TaskBridgeRuntime started");

        Ok(TaskBridgeRuntime {
            bridge,
            tasks,
            #[cfg(feature = "http")]
            http,
        })
    }
}

#[cfg(feature = "http")]
struct HttpServer {
    handle: JoinHandle<Result<()>>,
    shutdown: Arc<Notify>,
    local_addr: SocketAddr,
}

/// A running taskbridge instance that can be embedded in an application.
///
/// The runtime manages:
/// - the backend worker and inbound collector behind the [`Bridge`]
/// - the HTTP server, when one was configured
///
/// Call [`shutdown`](Self::shutdown) for graceful termination.
pub struct TaskBridgeRuntime {
    bridge: Bridge,
    tasks: BridgeTasks,
    #[cfg(feature = "http")]
    http: Option<HttpServer>,
}

impl TaskBridgeRuntime {
    /// Create a new builder for configuring the runtime.
    pub fn builder() -> TaskBridgeRuntimeBuilder {
        TaskBridgeRuntimeBuilder::new()
    }

    /// Handle for submitting requests directly.
    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Address the HTTP server is actually bound to.
    #[cfg(feature = "http")]
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http.as_ref().map(|http| http.local_addr)
    }

    /// Check if the runtime is still running.
    pub fn is_running(&self) -> bool {
        #[cfg(feature = "http")]
        if self.http.as_ref().is_some_and(|http| http.handle.is_finished()) {
            return false;
        }
        self.tasks.is_running()
    }

    /// Gracefully shut down the runtime.
    ///
    /// Stops accepting HTTP connections first, then lets the worker drain
    /// the queue so every request already accepted gets its outcome.
    pub async fn shutdown(self) -> Result<()> {
        info!("TaskBridgeRuntime shutting down...");

        #[cfg(feature = "http")]
        if let Some(http) = self.http {
            http.shutdown.notify_one();
            match http.handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("HTTP server error during shutdown: {}", e),
                Err(e) => error!("HTTP server task panicked: {}", e),
            }
        }

        match self.tasks.shutdown().await {
            Ok(()) => {
                info!("TaskBridgeRuntime shutdown complete");
                Ok(())
            }
            Err(e) => {
                error!("Bridge task panicked: {}", e);
                Err(anyhow::anyhow!("bridge task panicked: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::task::{TaskRecord, TaskRequest, TaskStatus};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    /// Mock store for testing the runtime builder without a database.
    struct MockStore;

    #[async_trait]
    impl TaskStore for MockStore {
        async fn create_task(
            &self,
            _title: &str,
            _description: &str,
        ) -> Result<TaskRecord, StoreError> {
            Err(StoreError::NotFound { id: 0 })
        }

        async fn list_tasks(&self) -> Result<Vec<TaskRecord>, StoreError> {
            Ok(Vec::new())
        }

        async fn update_task(
            &self,
            id: i64,
            _title: &str,
            _description: &str,
            _status: TaskStatus,
            _updated_at: DateTime<Utc>,
        ) -> Result<TaskRecord, StoreError> {
            Err(StoreError::NotFound { id })
        }

        async fn delete_task(&self, id: i64) -> Result<(), StoreError> {
            Err(StoreError::NotFound { id })
        }
    }

    #[test]
    fn test_builder_default() {
        let builder = TaskBridgeRuntimeBuilder::default();
        assert!(builder.store.is_none());
        assert_eq!(builder.bridge_config, BridgeConfig::default());
    }

    #[test]
    fn test_builder_debug_hides_store() {
        let builder = TaskBridgeRuntime::builder().store(Arc::new(MockStore));
        let debug_str = format!("{:?}", builder);
        assert!(debug_str.contains("TaskBridgeRuntimeBuilder"));
        assert!(debug_str.contains("..."));
    }

    #[test]
    fn test_builder_build_missing_store() {
        let err = TaskBridgeRuntimeBuilder::new().build().unwrap_err();
        assert!(err.to_string().contains("store is required"));
    }

    #[test]
    fn test_builder_rejects_zero_bounds() {
        let err = TaskBridgeRuntime::builder()
            .store(Arc::new(MockStore))
            .bridge_config(BridgeConfig {
                max_in_flight: 0,
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_in_flight"));

        let err = TaskBridgeRuntime::builder()
            .store(Arc::new(MockStore))
            .bridge_config(BridgeConfig {
                token_space: 0,
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("token_space"));
    }

    #[tokio::test]
    async fn test_runtime_bridge_only() {
        let runtime = TaskBridgeRuntime::builder()
            .store(Arc::new(MockStore))
            .build()
            .unwrap()
            .start()
            .await
            .unwrap();

        assert!(runtime.is_running());
        #[cfg(feature = "http")]
        assert!(runtime.http_addr().is_none());

        let outcome = runtime.bridge().submit(TaskRequest::Read).await.unwrap();
        assert!(outcome.success);

        let outcome = runtime
            .bridge()
            .submit(TaskRequest::Delete { id: 3 })
            .await
            .unwrap();
        assert!(!outcome.success);
        assert!(outcome.tasks.is_empty());

        let bridge = runtime.bridge().clone();
        runtime.shutdown().await.unwrap();
        assert!(bridge.is_closed());
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn test_runtime_serves_health_over_tcp() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let store = crate::persistence::SqliteTaskStore::connect("sqlite::memory:")
            .await
            .unwrap();
        let runtime = TaskBridgeRuntime::builder()
            .store(Arc::new(store))
            .http_addr("127.0.0.1:0".parse().unwrap())
            .build()
            .unwrap()
            .start()
            .await
            .unwrap();

        let addr = runtime.http_addr().unwrap();
        assert_ne!(addr.port(), 0);

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
        assert!(response.contains("\"status\":\"ok\""));

        runtime.shutdown().await.unwrap();
    }
}
