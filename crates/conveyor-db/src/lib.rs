//! Conveyor database layer
//!
//! Task store backends and the embedded sqlx migrations for the `tasks`
//! table. Run [`MIGRATOR`] against the pool at startup.

pub mod db;

pub use db::{MemoryTaskStore, TaskRepository};

/// Embedded migrations from `./migrations`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
