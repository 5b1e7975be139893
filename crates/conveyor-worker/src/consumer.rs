//! Consumer: dequeues work items, drives the task state machine, and
//! acknowledges only after the terminal state is durably persisted.
//!
//! The queue delivers at least once, so every step here is written to be
//! safe under duplicate delivery. The idempotency guard is the store's
//! conditional `Pending -> Processing` transition; a message that loses that
//! race exits without side effects. Redelivery (receive count > 1) implies
//! the visibility window expired and the prior owner is treated as dead, so
//! the claim is adopted and the pure processor re-runs safely.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::time::sleep;

use conveyor_core::models::{TaskStatus, WorkItem};
use conveyor_core::TaskStore;
use conveyor_queue::{QueueMessage, WorkQueue};

use crate::processor::TaskProcessor;

#[derive(Clone)]
pub struct ConsumerConfig {
    pub max_workers: usize,
    pub batch_size: usize,
    pub visibility_timeout: Duration,
    pub poll_interval: Duration,
    /// Delivery attempts before a work item is dead-lettered and its task
    /// marked failed.
    pub max_receive_count: u32,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            batch_size: 10,
            visibility_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(1000),
            max_receive_count: 5,
        }
    }
}

/// What a single delivery amounted to. Outcomes that leave the message
/// unacknowledged (`InFlight`, `Redeliver`) rely on the visibility timeout
/// for the next attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    /// Processed and completed; acknowledged.
    Completed,
    /// Domain failure recorded on the task; acknowledged.
    Failed,
    /// Task already terminal; acknowledged without re-executing anything.
    Duplicate,
    /// A concurrent delivery owns the claim; no side effects, no ack.
    InFlight,
    /// Transient failure; left unacknowledged for redelivery.
    Redeliver,
    /// Malformed payload or retries exhausted; routed to dead-letter.
    DeadLettered,
    /// Work item referenced an unknown task; acknowledged and dropped.
    Dropped,
}

pub struct Consumer {
    store: Arc<dyn TaskStore>,
    queue: Arc<dyn WorkQueue>,
    processor: Arc<dyn TaskProcessor>,
    config: ConsumerConfig,
}

impl Consumer {
    pub fn new(
        store: Arc<dyn TaskStore>,
        queue: Arc<dyn WorkQueue>,
        processor: Arc<dyn TaskProcessor>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            store,
            queue,
            processor,
            config,
        }
    }

    /// Worker pool loop: dequeue batches and dispatch each message to a
    /// bounded set of concurrent handlers until shutdown is signalled.
    pub async fn run(self: Arc<Self>, mut shutdown_rx: mpsc::Receiver<()>) {
        tracing::info!(
            max_workers = self.config.max_workers,
            batch_size = self.config.batch_size,
            visibility_timeout_secs = self.config.visibility_timeout.as_secs(),
            "Consumer worker pool started"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_workers));

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Consumer worker pool shutting down");
                    break;
                }
                batch = self.queue.dequeue(self.config.batch_size, self.config.visibility_timeout) => {
                    match batch {
                        Ok(messages) if messages.is_empty() => {
                            sleep(self.config.poll_interval).await;
                        }
                        Ok(messages) => {
                            for message in messages {
                                let permit = match semaphore.clone().acquire_owned().await {
                                    Ok(permit) => permit,
                                    Err(_) => return,
                                };
                                let consumer = self.clone();
                                tokio::spawn(async move {
                                    let _permit = permit;
                                    let outcome = consumer.handle_message(&message).await;
                                    tracing::debug!(
                                        message_id = %message.message_id,
                                        outcome = ?outcome,
                                        "Work item handled"
                                    );
                                });
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to dequeue work items");
                            sleep(self.config.poll_interval).await;
                        }
                    }
                }
            }
        }

        tracing::info!("Consumer worker pool stopped");
    }

    /// Handle one delivery. Never panics and never surfaces an error to the
    /// loop; every failure maps to an outcome, and outcomes that skip the
    /// ack leave redelivery to the queue.
    #[tracing::instrument(skip(self, message), fields(message_id = %message.message_id, receive_count = message.receive_count))]
    pub async fn handle_message(&self, message: &QueueMessage) -> HandleOutcome {
        let item = match WorkItem::from_json(&message.body) {
            Ok(item) => item,
            Err(e) => {
                tracing::warn!(error = %e, "Malformed work item payload, dead-lettering");
                return self.send_to_dead_letter(message).await;
            }
        };

        if message.receive_count > self.config.max_receive_count {
            return self.retire_exhausted(message, &item).await;
        }

        let claimed = match self
            .store
            .transition(item.task_id, TaskStatus::Pending, TaskStatus::Processing, None)
            .await
        {
            Ok(claimed) => claimed,
            Err(e) => {
                tracing::warn!(task_id = %item.task_id, error = %e, "Store unavailable while claiming, leaving for redelivery");
                return HandleOutcome::Redeliver;
            }
        };

        if !claimed {
            match self.store.get_task(item.task_id).await {
                Ok(Some(task)) if task.status.is_terminal() => {
                    // Duplicate delivery of finished work: acknowledge without
                    // touching the record or re-running the processor.
                    tracing::debug!(task_id = %item.task_id, status = %task.status, "Task already terminal, dropping duplicate delivery");
                    self.ack_best_effort(message).await;
                    return HandleOutcome::Duplicate;
                }
                Ok(Some(_)) => {
                    if message.receive_count <= 1 {
                        // Concurrent duplicate: the other delivery owns the
                        // claim. Exit without side effects; if the owner dies,
                        // the visibility timeout redelivers this item.
                        tracing::debug!(task_id = %item.task_id, "Claim held by a concurrent delivery, backing off");
                        return HandleOutcome::InFlight;
                    }
                    // Redelivery: the window expired, the prior owner is
                    // presumed dead. Adopt the claim; processing is pure, so
                    // re-executing it is safe.
                    tracing::info!(task_id = %item.task_id, "Adopting stale processing claim after redelivery");
                }
                Ok(None) => {
                    tracing::warn!(task_id = %item.task_id, "Work item references unknown task, dropping");
                    self.ack_best_effort(message).await;
                    return HandleOutcome::Dropped;
                }
                Err(e) => {
                    tracing::warn!(task_id = %item.task_id, error = %e, "Store unavailable while inspecting claim, leaving for redelivery");
                    return HandleOutcome::Redeliver;
                }
            }
        }

        match self.processor.process(&item).await {
            Ok(result) => {
                self.finish(message, &item, TaskStatus::Completed, &result)
                    .await
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    task_id = %item.task_id,
                    error = %e,
                    "Transient processing failure, leaving for redelivery"
                );
                HandleOutcome::Redeliver
            }
            Err(e) => {
                tracing::error!(task_id = %item.task_id, error = %e, "Processing failed");
                let diagnostic = format!("Error: {}", e);
                self.finish(message, &item, TaskStatus::Failed, &diagnostic)
                    .await
            }
        }
    }

    /// Persist the terminal state, then acknowledge. The order matters: an
    /// ack before the store write could lose the result on a crash between
    /// the two.
    async fn finish(
        &self,
        message: &QueueMessage,
        item: &WorkItem,
        terminal: TaskStatus,
        result: &str,
    ) -> HandleOutcome {
        match self
            .store
            .transition(item.task_id, TaskStatus::Processing, terminal, Some(result))
            .await
        {
            Ok(true) => {
                self.ack_best_effort(message).await;
                match terminal {
                    TaskStatus::Completed => {
                        tracing::info!(task_id = %item.task_id, "Task completed");
                        HandleOutcome::Completed
                    }
                    _ => {
                        tracing::error!(task_id = %item.task_id, "Task failed");
                        HandleOutcome::Failed
                    }
                }
            }
            Ok(false) => {
                // Another attempt already wrote a terminal state.
                tracing::debug!(task_id = %item.task_id, "Terminal state already recorded elsewhere");
                self.ack_best_effort(message).await;
                HandleOutcome::Duplicate
            }
            Err(e) => {
                tracing::warn!(
                    task_id = %item.task_id,
                    error = %e,
                    "Failed to persist terminal state, leaving for redelivery"
                );
                HandleOutcome::Redeliver
            }
        }
    }

    /// Dead-letter a work item whose delivery attempts ran out, and mark the
    /// task failed. The task may be `Processing` (a prior attempt died
    /// mid-flight) or still `Pending` (the claim never succeeded); a task
    /// that is already terminal is left as-is.
    async fn retire_exhausted(&self, message: &QueueMessage, item: &WorkItem) -> HandleOutcome {
        tracing::error!(
            task_id = %item.task_id,
            receive_count = message.receive_count,
            max_receive_count = self.config.max_receive_count,
            "Work item exhausted its delivery attempts, dead-lettering"
        );

        let diagnostic = format!(
            "Error: retries exhausted after {} deliveries",
            message.receive_count
        );
        let marked = match self
            .store
            .transition(
                item.task_id,
                TaskStatus::Processing,
                TaskStatus::Failed,
                Some(&diagnostic),
            )
            .await
        {
            Ok(true) => true,
            Ok(false) => matches!(
                self.store
                    .transition(
                        item.task_id,
                        TaskStatus::Pending,
                        TaskStatus::Failed,
                        Some(&diagnostic),
                    )
                    .await,
                Ok(true)
            ),
            Err(e) => {
                tracing::warn!(task_id = %item.task_id, error = %e, "Failed to mark exhausted task as failed");
                false
            }
        };

        if !marked {
            tracing::debug!(task_id = %item.task_id, "Exhausted task was already terminal or could not be updated");
        }

        self.send_to_dead_letter(message).await
    }

    async fn send_to_dead_letter(&self, message: &QueueMessage) -> HandleOutcome {
        match self.queue.dead_letter(message).await {
            Ok(()) => HandleOutcome::DeadLettered,
            Err(e) => {
                tracing::error!(
                    message_id = %message.message_id,
                    error = %e,
                    "Failed to dead-letter message, leaving for redelivery"
                );
                HandleOutcome::Redeliver
            }
        }
    }

    async fn ack_best_effort(&self, message: &QueueMessage) {
        if let Err(e) = self.queue.ack(message).await {
            // The terminal state is durable; a redelivery will hit the
            // terminal guard and converge.
            tracing::warn!(
                message_id = %message.message_id,
                error = %e,
                "Failed to acknowledge message"
            );
        }
    }
}
