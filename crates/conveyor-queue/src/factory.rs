use std::sync::Arc;

use crate::{MemoryQueue, QueueError, QueueResult, SqsQueue, WorkQueue};
use conveyor_core::{Config, QueueBackend};

/// Create a work queue backend based on configuration
pub async fn create_queue(config: &Config) -> QueueResult<Arc<dyn WorkQueue>> {
    match config.queue_backend {
        QueueBackend::Sqs => {
            let queue_url = config.sqs_queue_url.clone().ok_or_else(|| {
                QueueError::ConfigError("SQS_QUEUE_URL not configured".to_string())
            })?;

            let queue = SqsQueue::new(
                queue_url,
                config.sqs_dead_letter_queue_url.clone(),
                config.aws_region.clone(),
                config.aws_endpoint_url.clone(),
            )
            .await?;
            Ok(Arc::new(queue))
        }
        QueueBackend::Memory => Ok(Arc::new(MemoryQueue::new())),
    }
}
