use std::net::SocketAddr;

use gridpay_backend::api::{self, AppState};
use gridpay_backend::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Log startup info
    tracing::info!("Starting Gridpay Backend");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!("Merchant short code: {}", config.daraja.short_code);
    tracing::info!("Callback base URL: {}", config.server.callback_base_url);

    // Build router
    let app = api::router(AppState::new(config.clone()));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let sigint = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = sigint => tracing::info!("Received SIGINT. Shutting down gracefully..."),
        _ = sigterm => tracing::info!("Received SIGTERM. Shutting down gracefully..."),
    }
}
