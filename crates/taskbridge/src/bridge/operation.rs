// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Messages that travel through the bridge.

use std::fmt;

use crate::task::{TaskRecord, TaskStatus};

/// Binds one outbound [`Operation`] to its [`Outcome`].
///
/// Unique among outstanding requests only; a token may be reissued once its
/// previous round trip has fully completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationToken(u64);

impl CorrelationToken {
    /// Wrap a raw token value.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw token value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which store call an operation maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationTag {
    /// Insert a task.
    Create,
    /// List tasks.
    Read,
    /// Overwrite a task.
    Update,
    /// Remove a task.
    Delete,
}

impl OperationTag {
    /// Lowercase name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationTag::Create => "create",
            OperationTag::Read => "read",
            OperationTag::Update => "update",
            OperationTag::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated operation and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    /// Insert a task with an empty status.
    Create {
        /// Task title.
        title: String,
        /// Task description.
        description: String,
    },
    /// List every task.
    Read,
    /// Overwrite an existing task.
    Update {
        /// Task id.
        id: i64,
        /// New title.
        title: String,
        /// New description.
        description: String,
        /// New status.
        status: TaskStatus,
    },
    /// Remove a task.
    Delete {
        /// Task id.
        id: i64,
    },
}

impl OperationKind {
    /// The tag of this operation.
    pub fn tag(&self) -> OperationTag {
        match self {
            OperationKind::Create { .. } => OperationTag::Create,
            OperationKind::Read => OperationTag::Read,
            OperationKind::Update { .. } => OperationTag::Update,
            OperationKind::Delete { .. } => OperationTag::Delete,
        }
    }
}

/// An operation in transit from a caller to the backend worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Token allocated by the caller.
    pub token: CorrelationToken,
    /// What to execute.
    pub kind: OperationKind,
}

/// The backend worker's reply to one [`Operation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Token of the operation this answers.
    pub token: CorrelationToken,
    /// Whether the store call succeeded.
    pub success: bool,
    /// Resulting records. Always empty when `success` is false.
    pub tasks: Vec<TaskRecord>,
}

impl Outcome {
    /// A successful outcome.
    pub fn success(token: CorrelationToken, tasks: Vec<TaskRecord>) -> Self {
        Self {
            token,
            success: true,
            tasks,
        }
    }

    /// A failed outcome carrying no data.
    pub fn failure(token: CorrelationToken) -> Self {
        Self {
            token,
            success: false,
            tasks: Vec::new(),
        }
    }
}
