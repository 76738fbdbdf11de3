use crema_core::Config;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize the application (telemetry, state, routes)
    let (_state, router) = crema_api::setup::initialize_app(config.clone()).await?;

    // Start the server
    crema_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
