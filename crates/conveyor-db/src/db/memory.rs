//! In-memory task store for local development and tests.
//!
//! Mirrors the PostgreSQL repository's conditional-transition semantics: the
//! from-status check and the write happen under one lock, so concurrent
//! consumers racing for a claim observe exactly one winner.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use conveyor_core::models::{Task, TaskStats, TaskStatus};
use conveyor_core::{AppError, TaskStore};

#[derive(Default)]
struct Inner {
    tasks: HashMap<Uuid, Task>,
    // Creation order, for newest-first listings.
    order: Vec<Uuid>,
}

#[derive(Default)]
pub struct MemoryTaskStore {
    inner: Mutex<Inner>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panicked test thread; the map itself is
        // still consistent because every write is a whole-task replacement.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create_task(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task, AppError> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.map(String::from),
            status: TaskStatus::Pending,
            result: None,
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.lock();
        inner.order.push(task.id);
        inner.tasks.insert(task.id, task.clone());
        Ok(task)
    }

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

        let mut inner = self.lock();
        match inner.tasks.get_mut(&id) {
            Some(task) if task.status == from => {
                task.status = to;
                if let Some(result) = result {
                    task.result = Some(result.to_string());
                }
                task.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        Ok(self.lock().tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, limit: i64, offset: i64) -> Result<Vec<Task>, AppError> {
        let limit = limit.clamp(1, conveyor_core::constants::MAX_LIST_LIMIT) as usize;
        let offset = offset.max(0) as usize;

        let inner = self.lock();
        let tasks = inner
            .order
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .filter_map(|id| inner.tasks.get(id).cloned())
            .collect();
        Ok(tasks)
    }

    async fn get_stats(&self) -> Result<TaskStats, AppError> {
        let inner = self.lock();
        let mut stats = TaskStats {
            total: inner.tasks.len() as i64,
            ..Default::default()
        };
        for task in inner.tasks.values() {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Processing => stats.processing += 1,
                TaskStatus::Completed => stats.completed += 1,
                TaskStatus::Failed => stats.failed += 1,
            }
        }
        Ok(stats)
    }

    async fn reset_for_retry(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        let mut inner = self.lock();
        match inner.tasks.get_mut(&id) {
            Some(task) if task.status == TaskStatus::Failed => {
                task.status = TaskStatus::Pending;
                task.result = None;
                task.updated_at = Utc::now();
                Ok(Some(task.clone()))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_task_starts_pending_without_result() {
        let store = MemoryTaskStore::new();
        let task = store.create_task("T", Some("D")).await.unwrap();

        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.result, None);
        assert_eq!(task.created_at, task.updated_at);

        let fetched = store.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "T");
        assert_eq!(fetched.description.as_deref(), Some("D"));
    }

    #[tokio::test]
    async fn transition_is_conditional_on_from_status() {
        let store = MemoryTaskStore::new();
        let task = store.create_task("T", None).await.unwrap();

        let claimed = store
            .transition(task.id, TaskStatus::Pending, TaskStatus::Processing, None)
            .await
            .unwrap();
        assert!(claimed);

        // A second claim loses: the from-status is already consumed.
        let claimed_again = store
            .transition(task.id, TaskStatus::Pending, TaskStatus::Processing, None)
            .await
            .unwrap();
        assert!(!claimed_again);
    }

    #[tokio::test]
    async fn transition_records_result_and_touches_updated_at() {
        let store = MemoryTaskStore::new();
        let task = store.create_task("T", None).await.unwrap();

        store
            .transition(task.id, TaskStatus::Pending, TaskStatus::Processing, None)
            .await
            .unwrap();
        let mid = store.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(mid.result, None);

        store
            .transition(
                task.id,
                TaskStatus::Processing,
                TaskStatus::Completed,
                Some("done"),
            )
            .await
            .unwrap();
        let done = store.get_task(task.id).await.unwrap().unwrap();
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.result.as_deref(), Some("done"));
        assert!(done.updated_at >= mid.updated_at);
    }

    #[tokio::test]
    async fn illegal_edges_are_rejected() {
        let store = MemoryTaskStore::new();
        let task = store.create_task("T", None).await.unwrap();

        let err = store
            .transition(task.id, TaskStatus::Completed, TaskStatus::Processing, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = store
            .transition(task.id, TaskStatus::Pending, TaskStatus::Completed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn transition_on_unknown_task_returns_false() {
        let store = MemoryTaskStore::new();
        let applied = store
            .transition(
                Uuid::new_v4(),
                TaskStatus::Pending,
                TaskStatus::Processing,
                None,
            )
            .await
            .unwrap();
        assert!(!applied);
    }

    #[tokio::test]
    async fn list_tasks_newest_first_with_paging() {
        let store = MemoryTaskStore::new();
        let a = store.create_task("a", None).await.unwrap();
        let b = store.create_task("b", None).await.unwrap();
        let c = store.create_task("c", None).await.unwrap();

        let all = store.list_tasks(50, 0).await.unwrap();
        assert_eq!(
            all.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![c.id, b.id, a.id]
        );

        let page = store.list_tasks(1, 1).await.unwrap();
        assert_eq!(page[0].id, b.id);
    }

    #[tokio::test]
    async fn stats_count_by_status() {
        let store = MemoryTaskStore::new();
        let a = store.create_task("a", None).await.unwrap();
        let _b = store.create_task("b", None).await.unwrap();

        store
            .transition(a.id, TaskStatus::Pending, TaskStatus::Failed, Some("boom"))
            .await
            .unwrap();

        let stats = store.get_stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.completed, 0);
    }

    #[tokio::test]
    async fn reset_for_retry_only_applies_to_failed_tasks() {
        let store = MemoryTaskStore::new();
        let task = store.create_task("T", None).await.unwrap();

        assert!(store.reset_for_retry(task.id).await.unwrap().is_none());

        store
            .transition(task.id, TaskStatus::Pending, TaskStatus::Failed, Some("boom"))
            .await
            .unwrap();

        let reset = store.reset_for_retry(task.id).await.unwrap().unwrap();
        assert_eq!(reset.status, TaskStatus::Pending);
        assert_eq!(reset.result, None);
    }
}
