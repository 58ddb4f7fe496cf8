// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for taskbridge.
//!
//! [`BridgeError`] is what a caller of [`Bridge::submit`](crate::bridge::Bridge::submit)
//! sees. [`StoreError`] never reaches a caller directly: the backend worker turns it
//! into a failed [`Outcome`](crate::bridge::Outcome).

use std::time::Duration;

use crate::bridge::{CorrelationToken, OperationTag};

/// Errors surfaced by the caller facade.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum BridgeError {
    /// Input validation failed before the request entered the bridge.
    #[error("Validation error for '{field}': {message}")]
    Validation {
        /// The field that failed validation.
        field: String,
        /// The validation error message.
        message: String,
    },

    /// Token bookkeeping went wrong for this request.
    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    /// The caller gave up before its outcome arrived.
    #[error("{operation} operation timed out after {after:?}")]
    Timeout {
        /// The operation that timed out.
        operation: OperationTag,
        /// The configured request timeout.
        after: Duration,
    },

    /// The backend worker or inbound collector has stopped.
    #[error("bridge is closed")]
    Closed,
}

impl BridgeError {
    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Correlation(_) => "CORRELATION_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Closed => "BRIDGE_CLOSED",
        }
    }

    /// Shorthand for a validation failure.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Synchronization faults in token handling.
///
/// Any of these fails the one request involved; other in-flight requests
/// are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorrelationError {
    /// No free token could be found.
    #[error("no free correlation token among {outstanding} outstanding")]
    Exhausted {
        /// Tokens outstanding at the time of the attempt.
        outstanding: usize,
    },

    /// The token is not outstanding (double release or stray outcome).
    #[error("correlation token {0} is not outstanding")]
    UnknownToken(CorrelationToken),

    /// An outcome arrived carrying a different token than the one awaited.
    #[error("expected outcome for token {expected}, got {actual}")]
    Mismatch {
        /// Token the caller allocated.
        expected: CorrelationToken,
        /// Token carried by the outcome.
        actual: CorrelationToken,
    },
}

/// Errors from a [`TaskStore`](crate::persistence::TaskStore) call.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The task does not exist.
    #[error("Task {id} not found")]
    NotFound {
        /// The task id that was not found.
        id: i64,
    },

    /// Database operation failed.
    #[error("Database error during '{operation}': {details}")]
    Database {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },
}

impl StoreError {
    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Database { .. } => "DATABASE_ERROR",
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database {
            operation: "query".to_string(),
            details: err.to_string(),
        }
    }
}
