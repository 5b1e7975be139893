//! In-memory work queue for local development and tests.
//!
//! Reproduces the delivery semantics the consumer is written against:
//! at-least-once delivery, per-delivery receipt handles, visibility timeouts
//! with redelivery, receive counts, and a dead-letter side channel. Time is
//! tokio time, so paused-clock tests can drive redelivery deterministically.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::traits::{QueueMessage, QueueResult, WorkQueue};
use conveyor_core::QueueBackend;

struct StoredMessage {
    message_id: String,
    body: String,
    receive_count: u32,
}

struct InFlight {
    message: StoredMessage,
    visible_at: Instant,
}

#[derive(Default)]
struct Inner {
    ready: VecDeque<StoredMessage>,
    // Keyed by receipt handle; a redelivery mints a new handle, so handles
    // from expired deliveries naturally go stale.
    in_flight: HashMap<String, InFlight>,
    dead: Vec<StoredMessage>,
    seq: u64,
}

impl Inner {
    /// Move expired in-flight messages back to the ready queue.
    fn requeue_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .in_flight
            .iter()
            .filter(|(_, entry)| entry.visible_at <= now)
            .map(|(receipt, _)| receipt.clone())
            .collect();

        for receipt in expired {
            if let Some(entry) = self.in_flight.remove(&receipt) {
                self.ready.push_back(entry.message);
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryQueue {
    inner: Mutex<Inner>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of messages ready for delivery (not counting in-flight ones).
    pub fn depth(&self) -> usize {
        self.lock().ready.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.lock().in_flight.len()
    }

    pub fn dead_letter_len(&self) -> usize {
        self.lock().dead.len()
    }

    /// Bodies currently parked on the dead-letter channel, oldest first.
    pub fn dead_letter_bodies(&self) -> Vec<String> {
        self.lock().dead.iter().map(|m| m.body.clone()).collect()
    }
}

#[async_trait]
impl WorkQueue for MemoryQueue {
    async fn enqueue(&self, body: &str) -> QueueResult<String> {
        let mut inner = self.lock();
        inner.seq += 1;
        let message_id = format!("mem-{}", inner.seq);
        inner.ready.push_back(StoredMessage {
            message_id: message_id.clone(),
            body: body.to_string(),
            receive_count: 0,
        });
        Ok(message_id)
    }

    async fn dequeue(
        &self,
        max_batch: usize,
        visibility_timeout: Duration,
    ) -> QueueResult<Vec<QueueMessage>> {
        let now = Instant::now();
        let mut inner = self.lock();
        inner.requeue_expired(now);

        let mut delivered = Vec::new();
        while delivered.len() < max_batch.max(1) {
            let Some(mut stored) = inner.ready.pop_front() else {
                break;
            };
            stored.receive_count += 1;

            let receipt_handle = Uuid::new_v4().to_string();
            delivered.push(QueueMessage {
                message_id: stored.message_id.clone(),
                receipt_handle: receipt_handle.clone(),
                body: stored.body.clone(),
                receive_count: stored.receive_count,
            });
            inner.in_flight.insert(
                receipt_handle,
                InFlight {
                    message: stored,
                    visible_at: now + visibility_timeout,
                },
            );
        }

        Ok(delivered)
    }

    async fn ack(&self, message: &QueueMessage) -> QueueResult<()> {
        // Stale receipts (delivery already expired and redelivered) are a no-op.
        self.lock().in_flight.remove(&message.receipt_handle);
        Ok(())
    }

    async fn dead_letter(&self, message: &QueueMessage) -> QueueResult<()> {
        let mut inner = self.lock();
        if let Some(entry) = inner.in_flight.remove(&message.receipt_handle) {
            inner.dead.push(entry.message);
        }
        Ok(())
    }

    fn backend_type(&self) -> QueueBackend {
        QueueBackend::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VISIBILITY: Duration = Duration::from_secs(30);

    #[tokio::test(start_paused = true)]
    async fn enqueue_dequeue_ack_round_trip() {
        let queue = MemoryQueue::new();
        queue.enqueue("body-1").await.unwrap();

        let batch = queue.dequeue(10, VISIBILITY).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].body, "body-1");
        assert_eq!(batch[0].receive_count, 1);

        queue.ack(&batch[0]).await.unwrap();

        tokio::time::advance(VISIBILITY * 2).await;
        assert!(queue.dequeue(10, VISIBILITY).await.unwrap().is_empty());
        assert_eq!(queue.in_flight_len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_message_is_invisible() {
        let queue = MemoryQueue::new();
        queue.enqueue("body").await.unwrap();

        let first = queue.dequeue(10, VISIBILITY).await.unwrap();
        assert_eq!(first.len(), 1);

        // Before the visibility timeout expires, no other consumer sees it.
        assert!(queue.dequeue(10, VISIBILITY).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unacked_message_redelivers_with_incremented_count() {
        let queue = MemoryQueue::new();
        queue.enqueue("body").await.unwrap();

        let first = queue.dequeue(10, VISIBILITY).await.unwrap();
        assert_eq!(first[0].receive_count, 1);

        tokio::time::advance(VISIBILITY + Duration::from_secs(1)).await;

        let second = queue.dequeue(10, VISIBILITY).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].body, "body");
        assert_eq!(second[0].receive_count, 2);
        assert_ne!(second[0].receipt_handle, first[0].receipt_handle);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_receipt_ack_is_a_no_op() {
        let queue = MemoryQueue::new();
        queue.enqueue("body").await.unwrap();

        let first = queue.dequeue(10, VISIBILITY).await.unwrap();
        tokio::time::advance(VISIBILITY + Duration::from_secs(1)).await;
        let second = queue.dequeue(10, VISIBILITY).await.unwrap();
        assert_eq!(second.len(), 1);

        // The expired delivery's receipt no longer refers to anything.
        queue.ack(&first[0]).await.unwrap();
        assert_eq!(queue.in_flight_len(), 1);

        tokio::time::advance(VISIBILITY + Duration::from_secs(1)).await;
        let third = queue.dequeue(10, VISIBILITY).await.unwrap();
        assert_eq!(third[0].receive_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dead_letter_removes_from_delivery() {
        let queue = MemoryQueue::new();
        queue.enqueue("poison").await.unwrap();

        let batch = queue.dequeue(10, VISIBILITY).await.unwrap();
        queue.dead_letter(&batch[0]).await.unwrap();

        assert_eq!(queue.dead_letter_len(), 1);
        assert_eq!(queue.dead_letter_bodies(), vec!["poison".to_string()]);

        tokio::time::advance(VISIBILITY * 2).await;
        assert!(queue.dequeue(10, VISIBILITY).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn batch_size_is_respected() {
        let queue = MemoryQueue::new();
        for i in 0..5 {
            queue.enqueue(&format!("body-{}", i)).await.unwrap();
        }

        let batch = queue.dequeue(2, VISIBILITY).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(queue.depth(), 3);
        assert_eq!(queue.in_flight_len(), 2);
    }
}
