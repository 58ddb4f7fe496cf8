// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Persistence interfaces and backends for the task store.
//!
//! The backend worker is the only user of a [`TaskStore`]; it issues exactly one
//! call per operation and never calls concurrently.

pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresTaskStore;
pub use self::sqlite::SqliteTaskStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::task::{TaskRecord, TaskStatus};

/// Store operations the backend worker needs, one per operation tag.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a task with an empty status.
    async fn create_task(&self, title: &str, description: &str) -> Result<TaskRecord, StoreError>;

    /// All tasks, ordered by id.
    async fn list_tasks(&self) -> Result<Vec<TaskRecord>, StoreError>;

    /// Overwrite a task. A missing id is [`StoreError::NotFound`].
    async fn update_task(
        &self,
        id: i64,
        title: &str,
        description: &str,
        status: TaskStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<TaskRecord, StoreError>;

    /// Delete a task. A missing id is [`StoreError::NotFound`].
    async fn delete_task(&self, id: i64) -> Result<(), StoreError>;
}

/// Connect to the store named by `database_url` and run its migrations.
///
/// `sqlite:` URLs get a [`SqliteTaskStore`], anything else is treated as PostgreSQL.
pub async fn connect(database_url: &str) -> Result<Arc<dyn TaskStore>, StoreError> {
    if database_url.starts_with("sqlite:") {
        Ok(Arc::new(SqliteTaskStore::connect(database_url).await?))
    } else {
        Ok(Arc::new(PostgresTaskStore::connect(database_url).await?))
    }
}
