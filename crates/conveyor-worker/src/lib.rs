//! Conveyor task lifecycle coordinator
//!
//! The producer persists a task and enqueues its work item; the consumer
//! pool dequeues, drives the `Pending -> Processing -> {Completed, Failed}`
//! state machine idempotently, and acknowledges after the terminal state is
//! durable. Store, queue, and processor are injected as trait objects.

pub mod consumer;
pub mod processor;
pub mod producer;

pub use consumer::{Consumer, ConsumerConfig, HandleOutcome};
pub use processor::{DefaultProcessor, TaskProcessor};
pub use producer::Producer;
