//! Producer: accepts a task creation request, persists the initial record,
//! and enqueues a work item referencing it.
//!
//! The call is fire-and-forget: it returns once the record and the enqueue
//! are durable, without waiting for processing. When the enqueue fails after
//! the store write succeeded, the task is reconciled to `Failed` in the same
//! call path rather than left `Pending` forever.

use std::sync::Arc;

use conveyor_core::constants::MAX_TITLE_LENGTH;
use conveyor_core::models::{Task, TaskStatus, WorkItem};
use conveyor_core::{AppError, TaskStore};
use conveyor_queue::WorkQueue;

pub struct Producer {
    store: Arc<dyn TaskStore>,
    queue: Arc<dyn WorkQueue>,
}

impl Producer {
    pub fn new(store: Arc<dyn TaskStore>, queue: Arc<dyn WorkQueue>) -> Self {
        Self { store, queue }
    }

    /// Create a task and enqueue its work item.
    #[tracing::instrument(skip(self, title, description))]
    pub async fn submit(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task, AppError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::InvalidInput(
                "title must not be empty".to_string(),
            ));
        }
        if title.chars().count() > MAX_TITLE_LENGTH {
            return Err(AppError::InvalidInput(format!(
                "title must be at most {} characters",
                MAX_TITLE_LENGTH
            )));
        }

        let task = self.store.create_task(title, description).await?;

        match self.enqueue_work_item(&task).await {
            Ok(message_id) => {
                tracing::info!(
                    task_id = %task.id,
                    message_id = %message_id,
                    "Task submitted"
                );
                Ok(task)
            }
            Err(e) => {
                let diagnostic = format!("Failed to enqueue work item: {}", e);
                tracing::error!(
                    task_id = %task.id,
                    error = %e,
                    "Enqueue failed after store write, reconciling task to failed"
                );
                self.reconcile_enqueue_failure(&task, &diagnostic).await;
                Err(AppError::Queue(diagnostic))
            }
        }
    }

    /// Re-enqueue a work item for an existing task (administrative retrigger
    /// after `reset_for_retry`). Same reconciliation semantics as `submit`.
    #[tracing::instrument(skip(self, task), fields(task_id = %task.id))]
    pub async fn requeue(&self, task: &Task) -> Result<String, AppError> {
        match self.enqueue_work_item(task).await {
            Ok(message_id) => {
                tracing::info!(task_id = %task.id, message_id = %message_id, "Task re-enqueued");
                Ok(message_id)
            }
            Err(e) => {
                let diagnostic = format!("Failed to enqueue work item: {}", e);
                tracing::error!(task_id = %task.id, error = %e, "Re-enqueue failed");
                self.reconcile_enqueue_failure(task, &diagnostic).await;
                Err(AppError::Queue(diagnostic))
            }
        }
    }

    async fn enqueue_work_item(&self, task: &Task) -> Result<String, AppError> {
        let body = WorkItem::from_task(task).to_json()?;
        self.queue
            .enqueue(&body)
            .await
            .map_err(|e| AppError::Queue(e.to_string()))
    }

    /// Mark a task failed after its work item could not be enqueued. Best
    /// effort: when even this write fails the task is left `Pending` and the
    /// error is logged for operators.
    async fn reconcile_enqueue_failure(&self, task: &Task, diagnostic: &str) {
        match self
            .store
            .transition(
                task.id,
                TaskStatus::Pending,
                TaskStatus::Failed,
                Some(diagnostic),
            )
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    task_id = %task.id,
                    "Task no longer pending while reconciling enqueue failure"
                );
            }
            Err(persist_err) => {
                tracing::error!(
                    task_id = %task.id,
                    error = %persist_err,
                    "Failed to reconcile task after enqueue failure; task left pending"
                );
            }
        }
    }
}
