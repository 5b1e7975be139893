//! Conveyor work queue library
//!
//! Work queue abstraction and implementations: the `WorkQueue` trait, an SQS
//! backend for deployments, and an in-memory backend for local development
//! and tests. Both provide at-least-once delivery with visibility timeouts,
//! receive counts, and a dead-letter channel.

pub mod factory;
pub mod memory;
pub mod sqs;
pub mod traits;

// Re-export commonly used types
pub use conveyor_core::QueueBackend;
pub use factory::create_queue;
pub use memory::MemoryQueue;
pub use sqs::SqsQueue;
pub use traits::{QueueError, QueueMessage, QueueResult, WorkQueue};
