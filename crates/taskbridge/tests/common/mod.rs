// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for taskbridge integration tests.
//!
//! Provides an in-memory [`MemoryStore`] with knobs for latency and failures,
//! plus helpers for spinning up a bridge over it or over in-memory SQLite.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use taskbridge::bridge::{self, Bridge, BridgeConfig, BridgeTasks};
use taskbridge::persistence::{SqliteTaskStore, TaskStore};
use taskbridge::{StoreError, TaskRecord, TaskRequest, TaskStatus};

/// Title that makes [`MemoryStore`] panic inside the store call.
pub const PANIC_TITLE: &str = "__panic__";

/// Title that makes [`MemoryStore`] fail a create with a database error.
pub const FAIL_TITLE: &str = "__fail__";

/// Task store kept in memory, recording every call it receives.
#[derive(Default)]
pub struct MemoryStore {
    delay: Duration,
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    tasks: Vec<TaskRecord>,
    calls: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every store call sleeps for `delay` before touching state.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Calls in the order the store received them, e.g. `create:A`, `read`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn tasks(&self) -> Vec<TaskRecord> {
        self.state.lock().unwrap().tasks.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, title: &str, description: &str) -> Result<TaskRecord, StoreError> {
        self.record(format!("create:{}", title));
        tokio::time::sleep(self.delay).await;

        if title == PANIC_TITLE {
            panic!("store blew up");
        }
        if title == FAIL_TITLE {
            return Err(StoreError::Database {
                operation: "insert".to_string(),
                details: "scripted failure".to_string(),
            });
        }

        let now = Utc::now();
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let task = TaskRecord {
            id: state.next_id,
            title: title.to_string(),
            description: description.to_string(),
            status: String::new(),
            created_at: now,
            updated_at: now,
        };
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn list_tasks(&self) -> Result<Vec<TaskRecord>, StoreError> {
        self.record("read".to_string());
        tokio::time::sleep(self.delay).await;
        Ok(self.state.lock().unwrap().tasks.clone())
    }

    async fn update_task(
        &self,
        id: i64,
        title: &str,
        description: &str,
        status: TaskStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<TaskRecord, StoreError> {
        self.record(format!("update:{}", id));
        tokio::time::sleep(self.delay).await;

        let mut state = self.state.lock().unwrap();
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound { id })?;
        task.title = title.to_string();
        task.description = description.to_string();
        task.status = status.to_string();
        task.updated_at = updated_at;
        Ok(task.clone())
    }

    async fn delete_task(&self, id: i64) -> Result<(), StoreError> {
        self.record(format!("delete:{}", id));
        tokio::time::sleep(self.delay).await;

        let mut state = self.state.lock().unwrap();
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != id);
        if state.tasks.len() == before {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }
}

/// Spawn a bridge over a fresh in-memory SQLite store.
pub async fn sqlite_bridge(config: &BridgeConfig) -> (Bridge, BridgeTasks) {
    let store = SqliteTaskStore::connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");
    bridge::spawn(Arc::new(store), config)
}

/// Spawn a bridge over `store`, keeping a handle to it for inspection.
pub fn memory_bridge(
    store: Arc<MemoryStore>,
    config: &BridgeConfig,
) -> (Bridge, BridgeTasks) {
    bridge::spawn(store, config)
}

pub fn create(title: &str) -> TaskRequest {
    TaskRequest::Create {
        title: title.to_string(),
        description: format!("{} description", title),
    }
}

pub fn update(id: i64, title: &str, status: &str) -> TaskRequest {
    TaskRequest::Update {
        id,
        title: title.to_string(),
        description: String::new(),
        status: status.to_string(),
    }
}

/// Poll `check` until it holds or `deadline` passes.
pub async fn eventually(deadline: Duration, check: impl Fn() -> bool) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

/// Skip test if TEST_DATABASE_URL is not set.
#[macro_export]
macro_rules! skip_if_no_db {
    () => {
        if std::env::var("TEST_DATABASE_URL").is_err() {
            eprintln!("Skipping test: TEST_DATABASE_URL not set");
            return;
        }
    };
}
