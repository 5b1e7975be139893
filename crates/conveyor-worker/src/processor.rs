//! Task processor trait
//!
//! The consumer calls `process` once it owns a claimed task. Implementations
//! should be pure functions of the work item: deterministic and free of
//! external side effects, so that re-execution after a crashed attempt is
//! safe. Errors are tagged transient (redelivered) or fatal (task fails).

use async_trait::async_trait;

use conveyor_core::models::WorkItem;
use conveyor_core::ProcessingError;

#[async_trait]
pub trait TaskProcessor: Send + Sync {
    /// Compute the result string for a work item.
    async fn process(&self, item: &WorkItem) -> Result<String, ProcessingError>;
}

/// Default processor: a deterministic transformation of the task's input.
#[derive(Debug, Default, Clone)]
pub struct DefaultProcessor;

#[async_trait]
impl TaskProcessor for DefaultProcessor {
    async fn process(&self, item: &WorkItem) -> Result<String, ProcessingError> {
        let mut result = format!("Processed task '{}'", item.title);
        if let Some(ref description) = item.description {
            result.push_str(&format!(" with description: {}", description));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn default_processor_is_deterministic() {
        let item = WorkItem {
            task_id: Uuid::new_v4(),
            title: "T".to_string(),
            description: Some("D".to_string()),
        };

        let processor = DefaultProcessor;
        let first = processor.process(&item).await.unwrap();
        let second = processor.process(&item).await.unwrap();

        assert_eq!(first, "Processed task 'T' with description: D");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn default_processor_without_description() {
        let item = WorkItem {
            task_id: Uuid::new_v4(),
            title: "T".to_string(),
            description: None,
        };

        let result = DefaultProcessor.process(&item).await.unwrap();
        assert_eq!(result, "Processed task 'T'");
    }
}
