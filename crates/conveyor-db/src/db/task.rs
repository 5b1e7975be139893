use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use conveyor_core::models::{Task, TaskStats, TaskStatus};
use conveyor_core::{AppError, TaskStore};

/// PostgreSQL-backed task store.
///
/// All status changes go through a single conditional `UPDATE ... WHERE
/// status = $from`; the affected-row count is the claim/race signal, so no
/// in-process locking is needed.
#[derive(Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for TaskRepository {
    #[tracing::instrument(skip(self, description))]
    async fn create_task(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task, AppError> {
        let task: Task = sqlx::query_as::<Postgres, Task>(
            r#"
            INSERT INTO tasks (title, description, status)
            VALUES ($1, $2, 'pending')
            RETURNING id, title, description, status, result, created_at, updated_at
            "#,
        )
        .bind(title)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to insert task into database");
            AppError::Database(e)
        })?;

        tracing::info!(task_id = %task.id, "Task created");

        Ok(task)
    }

    #[tracing::instrument(skip(self, result))]
    async fn transition(
        &self,
        id: Uuid,
        from: TaskStatus,
        to: TaskStatus,
        result: Option<&str>,
    ) -> Result<bool, AppError> {
        if !from.can_transition_to(to) {
            return Err(AppError::InvalidInput(format!(
                "Illegal task transition: {} -> {}",
                from, to
            )));
        }

        let outcome = sqlx::query(
            r#"
            UPDATE tasks
            SET status = $3,
                result = COALESCE($4, result),
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(result)
        .execute(&self.pool)
        .await
        .map_err(AppError::Database)?;

        let applied = outcome.rows_affected() == 1;
        if applied {
            tracing::debug!(task_id = %id, from = %from, to = %to, "Task transitioned");
        } else {
            tracing::debug!(
                task_id = %id,
                from = %from,
                to = %to,
                "Task transition skipped, from-status no longer current"
            );
        }

        Ok(applied)
    }

    #[tracing::instrument(skip(self))]
    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        let task: Option<Task> = sqlx::query_as::<Postgres, Task>(
            r#"
            SELECT id, title, description, status, result, created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(task)
    }

    #[tracing::instrument(skip(self))]
    async fn list_tasks(&self, limit: i64, offset: i64) -> Result<Vec<Task>, AppError> {
        let limit = limit.clamp(1, conveyor_core::constants::MAX_LIST_LIMIT);
        let offset = offset.max(0);

        let tasks = sqlx::query_as::<Postgres, Task>(
            r#"
            SELECT id, title, description, status, result, created_at, updated_at
            FROM tasks
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(tasks)
    }

    #[tracing::instrument(skip(self))]
    async fn get_stats(&self) -> Result<TaskStats, AppError> {
        use sqlx::Row;
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) as total,
                COUNT(*) FILTER (WHERE status = 'pending') as pending,
                COUNT(*) FILTER (WHERE status = 'processing') as processing,
                COUNT(*) FILTER (WHERE status = 'completed') as completed,
                COUNT(*) FILTER (WHERE status = 'failed') as failed
            FROM tasks
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::Database)?;

        Ok(TaskStats {
            total: row.get::<Option<i64>, _>("total").unwrap_or(0),
            pending: row.get::<Option<i64>, _>("pending").unwrap_or(0),
            processing: row.get::<Option<i64>, _>("processing").unwrap_or(0),
            completed: row.get::<Option<i64>, _>("completed").unwrap_or(0),
            failed: row.get::<Option<i64>, _>("failed").unwrap_or(0),
        })
    }

    #[tracing::instrument(skip(self))]
    async fn reset_for_retry(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        let task: Option<Task> = sqlx::query_as::<Postgres, Task>(
            r#"
            UPDATE tasks
            SET status = 'pending',
                result = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'failed'
            RETURNING id, title, description, status, result, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::Database)?;

        if let Some(ref task) = task {
            tracing::info!(task_id = %task.id, "Task reset for retry");
        }

        Ok(task)
    }
}
