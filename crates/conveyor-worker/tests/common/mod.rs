//! Shared test doubles for the lifecycle tests: counting and failing
//! processors plus a queue whose enqueue always fails.
#![allow(dead_code)] // not every test binary uses every helper

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use conveyor_core::models::WorkItem;
use conveyor_core::{ProcessingError, QueueBackend};
use conveyor_queue::{QueueError, QueueMessage, QueueResult, WorkQueue};
use conveyor_worker::{DefaultProcessor, TaskProcessor};

/// Wraps the default processor and counts invocations, so tests can assert
/// that domain logic ran exactly once.
#[derive(Default)]
pub struct CountingProcessor {
    calls: AtomicUsize,
}

impl CountingProcessor {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskProcessor for CountingProcessor {
    async fn process(&self, item: &WorkItem) -> Result<String, ProcessingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Yield so concurrent-delivery tests actually interleave here.
        tokio::task::yield_now().await;
        DefaultProcessor.process(item).await
    }
}

/// Always raises a transient error; used to drive the bounded-retry path.
#[derive(Default)]
pub struct TransientFailProcessor {
    calls: AtomicUsize,
}

impl TransientFailProcessor {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskProcessor for TransientFailProcessor {
    async fn process(&self, _item: &WorkItem) -> Result<String, ProcessingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProcessingError::transient(anyhow::anyhow!(
            "downstream unavailable"
        )))
    }
}

/// Always raises a fatal (domain) error.
#[derive(Default)]
pub struct FatalFailProcessor;

#[async_trait]
impl TaskProcessor for FatalFailProcessor {
    async fn process(&self, _item: &WorkItem) -> Result<String, ProcessingError> {
        Err(ProcessingError::fatal(anyhow::anyhow!("boom")))
    }
}

/// Queue whose enqueue always fails, for producer reconciliation tests.
pub struct FailingQueue;

#[async_trait]
impl WorkQueue for FailingQueue {
    async fn enqueue(&self, _body: &str) -> QueueResult<String> {
        Err(QueueError::EnqueueFailed("broker unreachable".to_string()))
    }

    async fn dequeue(
        &self,
        _max_batch: usize,
        _visibility_timeout: Duration,
    ) -> QueueResult<Vec<QueueMessage>> {
        Ok(Vec::new())
    }

    async fn ack(&self, _message: &QueueMessage) -> QueueResult<()> {
        Ok(())
    }

    async fn dead_letter(&self, _message: &QueueMessage) -> QueueResult<()> {
        Ok(())
    }

    fn backend_type(&self) -> QueueBackend {
        QueueBackend::Memory
    }
}

/// A second delivery of the same body, as the queue would produce it after a
/// visibility timeout: fresh receipt handle, bumped receive count.
pub fn redelivery_of(message: &QueueMessage, receive_count: u32) -> QueueMessage {
    QueueMessage {
        message_id: message.message_id.clone(),
        receipt_handle: format!("{}-redelivered", message.receipt_handle),
        body: message.body.clone(),
        receive_count,
    }
}
