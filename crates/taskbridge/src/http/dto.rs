// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request and response bodies.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::task::TaskRecord;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Body of create and update requests. Missing fields default to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskBody {
    /// Task title.
    pub title: String,
    /// Task description.
    pub description: String,
    /// Requested status (updates only).
    pub status: String,
}

/// A task as returned to HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiTask {
    /// Task id.
    pub id: i64,
    /// Task title.
    pub title: String,
    /// Task description.
    pub description: String,
    /// Stored status, empty for never-updated tasks.
    pub status: String,
    /// Creation time, local, `YYYY-MM-DD HH:MM:SS`.
    pub created_at: String,
    /// Last update time, local, `YYYY-MM-DD HH:MM:SS`.
    pub updated_at: String,
}

fn local_timestamp(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string()
}

impl From<&TaskRecord> for ApiTask {
    fn from(task: &TaskRecord) -> Self {
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            status: task.status.clone(),
            created_at: local_timestamp(&task.created_at),
            updated_at: local_timestamp(&task.updated_at),
        }
    }
}

/// `{"message": ...}` acknowledgement body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody {
    /// Human-readable message.
    pub message: String,
}

/// Health probe body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthBody {
    /// `ok` while the bridge accepts requests, `closed` afterwards.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Milliseconds since the HTTP state was created.
    pub uptime_ms: u64,
    /// Tokens currently outstanding.
    pub outstanding: usize,
    /// Delivered outcomes not yet claimed.
    pub unclaimed: usize,
}
