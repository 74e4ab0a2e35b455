//! qravy-cloud binary entry point

use qravy_cloud::{AppState, BoxError, Config, api, logger};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    logger::init_logger(
        &config.log_level,
        config.log_json,
        config.log_dir.as_deref(),
    )?;

    tracing::info!("Starting qravy-cloud (env: {})", config.environment);

    let state = AppState::new(&config).await?;
    let app = api::create_router(state);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("qravy-cloud HTTP listening on {http_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("qravy-cloud stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
