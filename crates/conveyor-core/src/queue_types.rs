use serde::{Deserialize, Serialize};

/// Which work queue backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueBackend {
    /// AWS SQS (or an SQS-compatible endpoint such as LocalStack).
    Sqs,
    /// In-process queue for local development and tests.
    Memory,
}
