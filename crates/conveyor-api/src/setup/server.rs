use std::net::SocketAddr;

use anyhow::Context;
use axum::Router;

use conveyor_core::Config;

/// Bind and serve until the process is stopped.
pub async fn start_server(config: &Config, router: Router) -> Result<(), anyhow::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!(
        port = config.server_port,
        environment = %config.environment,
        "Server listening"
    );

    axum::serve(listener, router)
        .await
        .context("Server error")?;

    Ok(())
}
