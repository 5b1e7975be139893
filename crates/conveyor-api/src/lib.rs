//! Conveyor API
//!
//! HTTP surface over the task lifecycle coordinator: task submission, status
//! reads, and admin endpoints, plus application wiring and telemetry.

pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
