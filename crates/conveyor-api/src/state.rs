//! Application state shared across handlers.

use std::sync::Arc;

use tokio::sync::mpsc;

use conveyor_core::{Config, TaskStore};
use conveyor_queue::WorkQueue;
use conveyor_worker::Producer;

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn TaskStore>,
    pub queue: Arc<dyn WorkQueue>,
    pub producer: Producer,
    /// Present when an in-process consumer pool was spawned; dropping the
    /// sender (or sending on it) stops the pool.
    pub worker_shutdown: Option<mpsc::Sender<()>>,
}
