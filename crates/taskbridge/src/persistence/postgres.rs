// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed task store.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::StoreError;
use crate::migrations;
use crate::task::{TaskRecord, TaskStatus};

use super::TaskStore;

/// PostgreSQL-backed task store.
#[derive(Clone)]
pub struct PostgresTaskStore {
    pool: PgPool,
}

impl PostgresTaskStore {
    /// Create a new Postgres-backed store from an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect, verify the connection, and run migrations.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database {
                operation: "connect".to_string(),
                details: e.to_string(),
            })?;

        let row: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await?;
        tracing::debug!(result = row.0, "Database health check passed");

        migrations::run_postgres(&pool)
            .await
            .map_err(|e| StoreError::Database {
                operation: "migrate".to_string(),
                details: format!("Failed to run migrations: {}", e),
            })?;

        Ok(Self { pool })
    }

    /// The underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl TaskStore for PostgresTaskStore {
    async fn create_task(&self, title: &str, description: &str) -> Result<TaskRecord, StoreError> {
        let record = sqlx::query_as::<_, TaskRecord>(
            r#"
            INSERT INTO tasks (title, description)
            VALUES ($1, $2)
            RETURNING id, title, description, status, created_at, updated_at
            "#,
        )
        .bind(title)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_tasks(&self) -> Result<Vec<TaskRecord>, StoreError> {
        let rows = sqlx::query_as::<_, TaskRecord>(
            r#"
            SELECT id, title, description, status, created_at, updated_at
            FROM tasks
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn update_task(
        &self,
        id: i64,
        title: &str,
        description: &str,
        status: TaskStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<TaskRecord, StoreError> {
        let record = sqlx::query_as::<_, TaskRecord>(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, status = $4, updated_at = $5
            WHERE id = $1
            RETURNING id, title, description, status, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(status.as_str())
        .bind(updated_at)
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or(StoreError::NotFound { id })
    }

    async fn delete_task(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { id });
        }

        Ok(())
    }
}
