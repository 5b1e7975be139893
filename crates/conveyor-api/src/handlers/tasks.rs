use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::HttpAppError;
use crate::state::AppState;
use conveyor_core::models::{CreateTaskRequest, TaskListQuery, TaskResponse, TaskStatus};
use conveyor_core::AppError;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
    pub task_id: Uuid,
}

/// Create a new task and enqueue it for processing.
#[tracing::instrument(skip(state, request))]
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), HttpAppError> {
    request.validate().map_err(AppError::from)?;

    let task = state
        .producer
        .submit(&request.title, request.description.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

/// List tasks, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let tasks = state
        .store
        .list_tasks(query.limit.unwrap_or(50), query.offset.unwrap_or(0))
        .await?;

    let task_responses: Vec<TaskResponse> = tasks.into_iter().map(TaskResponse::from).collect();

    Ok(Json(serde_json::json!({
        "tasks": task_responses,
        "count": task_responses.len()
    })))
}

/// Get a task by ID. Reads the most recently committed state; a pending task
/// is a 200 with a null result, never a 404.
#[tracing::instrument(skip(state))]
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<TaskResponse>, HttpAppError> {
    let task = state.store.get_task(task_id).await?;

    match task {
        Some(task) => Ok(Json(TaskResponse::from(task))),
        None => {
            tracing::debug!(task_id = %task_id, "Task not found");
            Err(AppError::NotFound(format!("Task with id {} not found", task_id)).into())
        }
    }
}

/// Administrative retrigger: reset a failed task to pending and re-enqueue
/// its work item.
#[tracing::instrument(skip(state))]
pub async fn process_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, HttpAppError> {
    let task = state
        .store
        .get_task(task_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Task with id {} not found", task_id)))?;

    if task.status != TaskStatus::Failed {
        return Err(AppError::Conflict(format!(
            "Task {} is {}; only failed tasks can be reprocessed",
            task_id, task.status
        ))
        .into());
    }

    let reset = state
        .store
        .reset_for_retry(task_id)
        .await?
        .ok_or_else(|| {
            // Lost a race with a concurrent reset or delivery.
            AppError::Conflict(format!("Task {} is no longer failed", task_id))
        })?;

    state.producer.requeue(&reset).await?;

    tracing::info!(task_id = %task_id, "Task re-enqueued for processing");

    Ok(Json(MessageResponse {
        message: format!("Task {} sent for processing", task_id),
        task_id,
    }))
}
