use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use wardlab_core::{CoreConfig, config::optional_path_from_env_value};

/// Main entry point for the Ward & Lab service
///
/// Resolves configuration once from the environment, opens the request store and ward
/// directory, and serves the REST API until interrupted.
///
/// # Environment Variables
/// - `WARDLAB_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `WARDLAB_DATA_DIR`: Directory for the request store (unset keeps requests in memory)
/// - `WARDLAB_DIRECTORY_FILE`: Ward/room directory YAML file
/// - `API_KEY`: Shared API key every caller must present
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration is invalid or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wardlab=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let api_key = std::env::var("API_KEY")
        .map_err(|_| anyhow::anyhow!("API_KEY must be set"))?;

    let cfg = Arc::new(CoreConfig::new(
        std::env::var("WARDLAB_REST_ADDR").ok(),
        optional_path_from_env_value(std::env::var("WARDLAB_DATA_DIR").ok()),
        optional_path_from_env_value(std::env::var("WARDLAB_DIRECTORY_FILE").ok()),
        api_key,
    )?);

    let lifecycle = cfg.lifecycle_service()?;
    let app = router(AppState::new(cfg.clone(), lifecycle));

    tracing::info!("++ Starting Ward & Lab REST on {}", cfg.rest_addr());

    let listener = tokio::net::TcpListener::bind(cfg.rest_addr()).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- Ward & Lab REST stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
