mod common;

use std::sync::Arc;

use common::FailingQueue;
use conveyor_core::models::TaskStatus;
use conveyor_core::{AppError, TaskStore};
use conveyor_db::MemoryTaskStore;
use conveyor_queue::MemoryQueue;
use conveyor_worker::Producer;

/// Submitting a valid task persists it as pending with no result and
/// enqueues exactly one work item.
#[tokio::test]
async fn submit_persists_pending_task_and_enqueues() {
    let store = Arc::new(MemoryTaskStore::new());
    let queue = Arc::new(MemoryQueue::new());
    let producer = Producer::new(store.clone(), queue.clone());

    let task = producer.submit("T", Some("D")).await.unwrap();

    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.result, None);
    assert_eq!(queue.depth(), 1);

    let fetched = store.get_task(task.id).await.unwrap().unwrap();
    assert_eq!(fetched.status, TaskStatus::Pending);
    assert_eq!(fetched.result, None);
}

#[tokio::test]
async fn submit_rejects_empty_title_before_persisting() {
    let store = Arc::new(MemoryTaskStore::new());
    let queue = Arc::new(MemoryQueue::new());
    let producer = Producer::new(store.clone(), queue.clone());

    let err = producer.submit("   ", None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    assert_eq!(store.get_stats().await.unwrap().total, 0);
    assert_eq!(queue.depth(), 0);
}

#[tokio::test]
async fn submit_rejects_overlong_title() {
    let store = Arc::new(MemoryTaskStore::new());
    let queue = Arc::new(MemoryQueue::new());
    let producer = Producer::new(store.clone(), queue.clone());

    let err = producer.submit(&"x".repeat(256), None).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
    assert_eq!(store.get_stats().await.unwrap().total, 0);
}

#[tokio::test]
async fn submit_trims_surrounding_whitespace() {
    let store = Arc::new(MemoryTaskStore::new());
    let queue = Arc::new(MemoryQueue::new());
    let producer = Producer::new(store, queue);

    let task = producer.submit("  T  ", None).await.unwrap();
    assert_eq!(task.title, "T");
}

/// When the enqueue fails after the store write, the task is reconciled to
/// failed with a diagnostic result instead of being left pending forever.
#[tokio::test]
async fn enqueue_failure_reconciles_task_to_failed() {
    let store = Arc::new(MemoryTaskStore::new());
    let producer = Producer::new(store.clone(), Arc::new(FailingQueue));

    let err = producer.submit("T", Some("D")).await.unwrap_err();
    assert!(matches!(err, AppError::Queue(_)));

    let tasks = store.list_tasks(50, 0).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].status, TaskStatus::Failed);
    let result = tasks[0].result.as_deref().unwrap();
    assert!(result.contains("Failed to enqueue work item"));
    assert!(result.contains("broker unreachable"));
}

/// Administrative retrigger: a failed task can be reset and re-enqueued.
#[tokio::test]
async fn requeue_after_reset_for_retry() {
    let store = Arc::new(MemoryTaskStore::new());
    let queue = Arc::new(MemoryQueue::new());
    let producer = Producer::new(store.clone(), queue.clone());

    let task = producer.submit("T", None).await.unwrap();
    store
        .transition(task.id, TaskStatus::Pending, TaskStatus::Failed, Some("Error: boom"))
        .await
        .unwrap();

    let reset = store.reset_for_retry(task.id).await.unwrap().unwrap();
    assert_eq!(reset.status, TaskStatus::Pending);
    assert_eq!(reset.result, None);

    producer.requeue(&reset).await.unwrap();
    assert_eq!(queue.depth(), 2);
}
