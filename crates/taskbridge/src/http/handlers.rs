// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Route handlers. Each one submits a single request through the bridge.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::debug;

use crate::task::TaskRequest;

use super::HttpState;
use super::dto::{ApiTask, HealthBody, MessageBody, TaskBody};
use super::error::ApiErrorResponse;

/// `GET /tasks`
pub async fn list_tasks(
    State(state): State<HttpState>,
) -> Result<Json<Vec<ApiTask>>, ApiErrorResponse> {
    let outcome = state.bridge.submit(TaskRequest::Read).await?;
    if !outcome.success {
        return Err(ApiErrorResponse::internal_error("failed to read tasks"));
    }

    Ok(Json(outcome.tasks.iter().map(ApiTask::from).collect()))
}

/// `POST /tasks`
pub async fn create_task(
    State(state): State<HttpState>,
    Json(body): Json<TaskBody>,
) -> Result<(StatusCode, Json<ApiTask>), ApiErrorResponse> {
    let outcome = state
        .bridge
        .submit(TaskRequest::Create {
            title: body.title,
            description: body.description,
        })
        .await?;

    let task = outcome
        .tasks
        .first()
        .filter(|_| outcome.success)
        .map(ApiTask::from)
        .ok_or_else(|| ApiErrorResponse::internal_error("failed to create task"))?;

    debug!(task_id = task.id, "Task created");
    Ok((StatusCode::CREATED, Json(task)))
}

/// `PUT /tasks/{id}`
pub async fn update_task(
    State(state): State<HttpState>,
    Path(id): Path<i64>,
    Json(body): Json<TaskBody>,
) -> Result<Json<ApiTask>, ApiErrorResponse> {
    let outcome = state
        .bridge
        .submit(TaskRequest::Update {
            id,
            title: body.title,
            description: body.description,
            status: body.status,
        })
        .await?;

    outcome
        .tasks
        .first()
        .filter(|_| outcome.success)
        .map(|task| Json(ApiTask::from(task)))
        .ok_or_else(|| ApiErrorResponse::not_found(format!("task {} could not be updated", id)))
}

/// `DELETE /tasks/{id}`
pub async fn delete_task(
    State(state): State<HttpState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageBody>, ApiErrorResponse> {
    let outcome = state.bridge.submit(TaskRequest::Delete { id }).await?;
    if !outcome.success {
        return Err(ApiErrorResponse::not_found(format!(
            "task {} could not be deleted",
            id
        )));
    }

    Ok(Json(MessageBody {
        message: "task is deleted".to_string(),
    }))
}

/// `GET /health`
pub async fn health(State(state): State<HttpState>) -> Json<HealthBody> {
    let status = if state.bridge.is_closed() { "closed" } else { "ok" };

    Json(HealthBody {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_ms: state.start_time.elapsed().as_millis() as u64,
        outstanding: state.bridge.outstanding(),
        unclaimed: state.bridge.unclaimed(),
    })
}
