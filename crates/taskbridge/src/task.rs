// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Task records and the caller-side request shape.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::bridge::{OperationKind, OperationTag};
use crate::error::BridgeError;

/// Task record as stored by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskRecord {
    /// Database primary key.
    pub id: i64,
    /// Short task title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Raw stored status. Empty until the task is first updated.
    pub status: String,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Statuses a task may be moved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started.
    New,
    /// Being worked on.
    InProgress,
    /// Finished.
    Done,
}

impl TaskStatus {
    /// Every accepted status, in workflow order.
    pub const ALL: [TaskStatus; 3] = [TaskStatus::New, TaskStatus::InProgress, TaskStatus::Done];

    /// The stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::New => "new",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| BridgeError::validation("status", format!("status '{}' is not valid", s)))
    }
}

/// A request as handed to [`Bridge::submit`](crate::bridge::Bridge::submit).
///
/// Unlike [`OperationKind`], an update here still carries the raw status string;
/// [`TaskRequest::into_operation`] is where it gets checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRequest {
    /// Create a task.
    Create {
        /// Task title.
        title: String,
        /// Task description.
        description: String,
    },
    /// List every task.
    Read,
    /// Overwrite title, description, and status of an existing task.
    Update {
        /// Task id.
        id: i64,
        /// New title.
        title: String,
        /// New description.
        description: String,
        /// Requested status, unvalidated.
        status: String,
    },
    /// Remove a task.
    Delete {
        /// Task id.
        id: i64,
    },
}

impl TaskRequest {
    /// The operation tag this request maps to.
    pub fn tag(&self) -> OperationTag {
        match self {
            TaskRequest::Create { .. } => OperationTag::Create,
            TaskRequest::Read => OperationTag::Read,
            TaskRequest::Update { .. } => OperationTag::Update,
            TaskRequest::Delete { .. } => OperationTag::Delete,
        }
    }

    /// Validate the request and turn it into the operation the worker executes.
    pub fn into_operation(self) -> Result<OperationKind, BridgeError> {
        Ok(match self {
            TaskRequest::Create { title, description } => {
                OperationKind::Create { title, description }
            }
            TaskRequest::Read => OperationKind::Read,
            TaskRequest::Update {
                id,
                title,
                description,
                status,
            } => OperationKind::Update {
                id,
                title,
                description,
                status: status.parse()?,
            },
            TaskRequest::Delete { id } => OperationKind::Delete { id },
        })
    }
}
