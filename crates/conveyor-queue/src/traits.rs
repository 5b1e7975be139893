//! Work queue abstraction trait
//!
//! This module defines the WorkQueue trait that all queue backends must
//! implement. Delivery is at-least-once: a dequeued message stays invisible
//! for its visibility timeout and is redelivered, with an incremented receive
//! count, if it is not acknowledged in time. Consumers must therefore
//! tolerate duplicates.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use conveyor_core::QueueBackend;

/// Queue operation errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Enqueue failed: {0}")]
    EnqueueFailed(String),

    #[error("Dequeue failed: {0}")]
    DequeueFailed(String),

    #[error("Ack failed: {0}")]
    AckFailed(String),

    #[error("Dead-letter failed: {0}")]
    DeadLetterFailed(String),

    #[error("Queue backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// One delivery of a work item.
///
/// `receipt_handle` identifies this particular delivery; it goes stale once
/// the visibility timeout expires and the message is delivered again.
/// `receive_count` counts delivery attempts (first delivery = 1).
#[derive(Debug, Clone)]
pub struct QueueMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    pub receive_count: u32,
}

/// Work queue abstraction trait
///
/// All queue backends (SQS, in-memory) must implement this trait. Producer
/// and consumer are written against it, so the broker can be swapped without
/// touching the lifecycle logic.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Enqueue a serialized work item; returns the message id.
    async fn enqueue(&self, body: &str) -> QueueResult<String>;

    /// Receive up to `max_batch` messages, hiding each from other consumers
    /// for `visibility_timeout`. Returns an empty vec when nothing is ready.
    async fn dequeue(
        &self,
        max_batch: usize,
        visibility_timeout: Duration,
    ) -> QueueResult<Vec<QueueMessage>>;

    /// Acknowledge (delete) a delivered message. Acking with a stale receipt
    /// handle is a no-op.
    async fn ack(&self, message: &QueueMessage) -> QueueResult<()>;

    /// Remove a message from the main queue and route it to the dead-letter
    /// destination when one is configured, otherwise drop it.
    async fn dead_letter(&self, message: &QueueMessage) -> QueueResult<()>;

    /// Get the queue backend type
    fn backend_type(&self) -> QueueBackend;
}
