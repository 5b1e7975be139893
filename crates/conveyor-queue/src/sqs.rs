use crate::traits::{QueueMessage, QueueResult, WorkQueue};
use crate::QueueError;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::types::MessageSystemAttributeName;
use aws_sdk_sqs::Client;
use std::time::Duration;

use conveyor_core::QueueBackend;

/// Long-poll wait on receive; bounds idle API calls without delaying
/// shutdown for too long (the in-flight receive is cancelled on select).
const WAIT_TIME_SECONDS: i32 = 10;

/// SQS work queue implementation
#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
    dead_letter_queue_url: Option<String>,
}

impl SqsQueue {
    /// Create a new SqsQueue instance
    ///
    /// # Arguments
    /// * `queue_url` - Main queue URL
    /// * `dead_letter_queue_url` - Optional DLQ for exhausted or malformed messages
    /// * `region` - AWS region (falls back to the environment/profile chain)
    /// * `endpoint_url` - Optional custom endpoint for SQS-compatible providers
    ///   (e.g., "http://localhost:4566" for LocalStack)
    pub async fn new(
        queue_url: String,
        dead_letter_queue_url: Option<String>,
        region: Option<String>,
        endpoint_url: Option<String>,
    ) -> QueueResult<Self> {
        if queue_url.is_empty() {
            return Err(QueueError::ConfigError("SQS queue URL is empty".to_string()));
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        if let Some(endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        Ok(SqsQueue {
            client: Client::new(&aws_config),
            queue_url,
            dead_letter_queue_url,
        })
    }
}

#[async_trait]
impl WorkQueue for SqsQueue {
    async fn enqueue(&self, body: &str) -> QueueResult<String> {
        let response = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, queue_url = %self.queue_url, "SQS send_message failed");
                QueueError::EnqueueFailed(e.to_string())
            })?;

        let message_id = response.message_id().unwrap_or_default().to_string();
        tracing::debug!(message_id = %message_id, "Work item enqueued");
        Ok(message_id)
    }

    async fn dequeue(
        &self,
        max_batch: usize,
        visibility_timeout: Duration,
    ) -> QueueResult<Vec<QueueMessage>> {
        let response = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_batch.clamp(1, 10) as i32)
            .visibility_timeout(visibility_timeout.as_secs() as i32)
            .wait_time_seconds(WAIT_TIME_SECONDS)
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, queue_url = %self.queue_url, "SQS receive_message failed");
                QueueError::DequeueFailed(e.to_string())
            })?;

        let messages = response
            .messages()
            .iter()
            .filter_map(|message| {
                let receipt_handle = message.receipt_handle()?.to_string();
                let receive_count = message
                    .attributes()
                    .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount))
                    .and_then(|count| count.parse().ok())
                    .unwrap_or(1);

                Some(QueueMessage {
                    message_id: message.message_id().unwrap_or_default().to_string(),
                    receipt_handle,
                    body: message.body().unwrap_or_default().to_string(),
                    receive_count,
                })
            })
            .collect();

        Ok(messages)
    }

    async fn ack(&self, message: &QueueMessage) -> QueueResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&message.receipt_handle)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    message_id = %message.message_id,
                    "SQS delete_message failed"
                );
                QueueError::AckFailed(e.to_string())
            })?;

        Ok(())
    }

    async fn dead_letter(&self, message: &QueueMessage) -> QueueResult<()> {
        if let Some(ref dlq_url) = self.dead_letter_queue_url {
            self.client
                .send_message()
                .queue_url(dlq_url)
                .message_body(&message.body)
                .send()
                .await
                .map_err(|e| {
                    tracing::error!(
                        error = %e,
                        message_id = %message.message_id,
                        dlq_url = %dlq_url,
                        "SQS dead-letter send failed"
                    );
                    QueueError::DeadLetterFailed(e.to_string())
                })?;
        } else {
            tracing::warn!(
                message_id = %message.message_id,
                "No dead-letter queue configured, dropping message"
            );
        }

        // Remove from the main queue either way so it stops redelivering.
        self.ack(message).await
    }

    fn backend_type(&self) -> QueueBackend {
        QueueBackend::Sqs
    }
}
