//! Configuration module
//!
//! Configuration is read from the environment (with `.env` support via
//! dotenvy) and validated once at startup. Every knob has a default except
//! `DATABASE_URL` and, when the SQS backend is selected, `SQS_QUEUE_URL`.

use std::env;
use std::time::Duration;

use crate::queue_types::QueueBackend;

const SERVER_PORT: u16 = 8000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const WORKER_MAX_WORKERS: usize = 4;
const WORKER_BATCH_SIZE: usize = 10;
const WORKER_VISIBILITY_TIMEOUT_SECS: u64 = 30;
const WORKER_POLL_INTERVAL_MS: u64 = 1000;
const WORKER_MAX_RECEIVE_COUNT: u32 = 5;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Selected work queue backend. SQS in deployments; memory for local runs.
    pub queue_backend: QueueBackend,
    pub sqs_queue_url: Option<String>,
    pub sqs_dead_letter_queue_url: Option<String>,
    pub aws_region: Option<String>,
    /// Custom endpoint for SQS-compatible providers (e.g. LocalStack).
    pub aws_endpoint_url: Option<String>,
    /// When false, the API serves requests but no consumer loop is spawned.
    pub worker_enabled: bool,
    pub worker_max_workers: usize,
    pub worker_batch_size: usize,
    pub worker_visibility_timeout_secs: u64,
    pub worker_poll_interval_ms: u64,
    /// Delivery attempts before a work item is dead-lettered and its task
    /// marked failed.
    pub worker_max_receive_count: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let queue_backend = match env::var("QUEUE_BACKEND")
            .unwrap_or_else(|_| "sqs".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => QueueBackend::Memory,
            _ => QueueBackend::Sqs,
        };

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            cors_origins,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            queue_backend,
            sqs_queue_url: env::var("SQS_QUEUE_URL").ok().filter(|s| !s.is_empty()),
            sqs_dead_letter_queue_url: env::var("SQS_DEAD_LETTER_QUEUE_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            aws_region: env::var("AWS_REGION").ok().filter(|s| !s.is_empty()),
            aws_endpoint_url: env::var("AWS_ENDPOINT_URL").ok().filter(|s| !s.is_empty()),
            worker_enabled: env::var("WORKER_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
            worker_max_workers: env::var("WORKER_MAX_WORKERS")
                .unwrap_or_else(|_| WORKER_MAX_WORKERS.to_string())
                .parse()
                .unwrap_or(WORKER_MAX_WORKERS),
            worker_batch_size: env::var("WORKER_BATCH_SIZE")
                .unwrap_or_else(|_| WORKER_BATCH_SIZE.to_string())
                .parse()
                .unwrap_or(WORKER_BATCH_SIZE),
            worker_visibility_timeout_secs: env::var("WORKER_VISIBILITY_TIMEOUT_SECS")
                .unwrap_or_else(|_| WORKER_VISIBILITY_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(WORKER_VISIBILITY_TIMEOUT_SECS),
            worker_poll_interval_ms: env::var("WORKER_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| WORKER_POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(WORKER_POLL_INTERVAL_MS),
            worker_max_receive_count: env::var("WORKER_MAX_RECEIVE_COUNT")
                .unwrap_or_else(|_| WORKER_MAX_RECEIVE_COUNT.to_string())
                .parse()
                .unwrap_or(WORKER_MAX_RECEIVE_COUNT),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.queue_backend == QueueBackend::Sqs && self.sqs_queue_url.is_none() {
            return Err(anyhow::anyhow!(
                "SQS_QUEUE_URL must be set when using the SQS queue backend"
            ));
        }

        if self.worker_batch_size == 0 || self.worker_batch_size > 10 {
            return Err(anyhow::anyhow!(
                "WORKER_BATCH_SIZE must be between 1 and 10 (SQS receive limit)"
            ));
        }

        if self.worker_visibility_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "WORKER_VISIBILITY_TIMEOUT_SECS must be greater than zero"
            ));
        }

        if self.worker_max_receive_count == 0 {
            return Err(anyhow::anyhow!(
                "WORKER_MAX_RECEIVE_COUNT must be greater than zero"
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_visibility_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.worker_poll_interval_ms)
    }
}
