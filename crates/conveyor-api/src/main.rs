use conveyor_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    conveyor_api::telemetry::init_telemetry();

    // Initialize the application (database, queue, worker, routes)
    let (_state, router) = conveyor_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    conveyor_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
