//! Task store abstraction
//!
//! The producer and consumer are constructed against this trait rather than
//! a concrete database client, so backends can be swapped (PostgreSQL in
//! deployments, in-memory for local development and tests).

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Task, TaskStats, TaskStatus};

/// Durable record of task identity and status.
///
/// `transition` is the coordination primitive: a single atomic conditional
/// update. Returning `false` (from-status mismatch) is how a consumer detects
/// a lost claim race or a duplicate delivery, so implementations must make
/// the check-and-set atomic per row.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new task with status `Pending` and no result.
    async fn create_task(&self, title: &str, description: Option<&str>)
        -> Result<Task, AppError>;

    /// Atomically move a task from `from` to `to`, recording `result` and
    /// touching `updated_at`. Returns `false` when the task's current status
    /// is not `from`. Edges outside the state machine are rejected with
    /// `AppError::InvalidInput`.
    async fn transition(
        &self,
        id: Uuid,
        from: TaskStatus,
        to: TaskStatus,
        result: Option<&str>,
    ) -> Result<bool, AppError>;

    /// Fetch a task by id.
    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, AppError>;

    /// List tasks, newest first.
    async fn list_tasks(&self, limit: i64, offset: i64) -> Result<Vec<Task>, AppError>;

    /// Aggregated per-status counts.
    async fn get_stats(&self) -> Result<TaskStats, AppError>;

    /// Administrative restart of a failed task: back to `Pending` with the
    /// result cleared, ready to re-enqueue. Returns `None` when the task does
    /// not exist or is not `Failed`. This is deliberately outside
    /// `transition`'s monotonic state machine.
    async fn reset_for_retry(&self, id: Uuid) -> Result<Option<Task>, AppError>;
}
