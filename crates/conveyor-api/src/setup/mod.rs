//! Application wiring: database pool, migrations, queue backend, producer,
//! optional in-process consumer pool, and the router.

pub mod routes;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::mpsc;

use conveyor_core::{Config, TaskStore};
use conveyor_db::TaskRepository;
use conveyor_worker::{Consumer, ConsumerConfig, DefaultProcessor, Producer};

use crate::state::AppState;

pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router), anyhow::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    conveyor_db::MIGRATOR
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let store: Arc<dyn TaskStore> = Arc::new(TaskRepository::new(pool));

    let queue = conveyor_queue::create_queue(&config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create work queue: {}", e))?;
    tracing::info!(backend = ?queue.backend_type(), "Work queue initialized");

    let producer = Producer::new(store.clone(), queue.clone());

    let worker_shutdown = if config.worker_enabled {
        let consumer = Arc::new(Consumer::new(
            store.clone(),
            queue.clone(),
            Arc::new(DefaultProcessor),
            ConsumerConfig {
                max_workers: config.worker_max_workers,
                batch_size: config.worker_batch_size,
                visibility_timeout: config.visibility_timeout(),
                poll_interval: config.poll_interval(),
                max_receive_count: config.worker_max_receive_count,
            },
        ));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        tokio::spawn(consumer.run(shutdown_rx));
        Some(shutdown_tx)
    } else {
        tracing::info!("Worker disabled, serving API only");
        None
    };

    let state = Arc::new(AppState {
        config,
        store,
        queue,
        producer,
        worker_shutdown,
    });

    let router = routes::build_router(state.clone());

    Ok((state, router))
}
