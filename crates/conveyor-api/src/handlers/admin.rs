use axum::{extract::State, response::Json};
use std::sync::Arc;

use crate::error::HttpAppError;
use crate::state::AppState;

/// System status: task counts by status plus which queue backend is active.
#[tracing::instrument(skip(state))]
pub async fn admin_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let stats = state.store.get_stats().await?;

    Ok(Json(serde_json::json!({
        "database": {
            "total_tasks": stats.total,
            "by_status": {
                "pending": stats.pending,
                "processing": stats.processing,
                "completed": stats.completed,
                "failed": stats.failed,
            },
        },
        "queue": {
            "backend": state.queue.backend_type(),
        },
        "worker": {
            "enabled": state.worker_shutdown.is_some(),
        },
    })))
}
