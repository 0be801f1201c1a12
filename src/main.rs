//! Crop disease detector server.
//!
//! Serves the upload page at `/` and relays uploaded photos to Google Gemini
//! at `POST /detect-disease`.
//!
//! ```bash
//! echo "GOOGLE_API_KEY=..." > .env
//! crop-disease-detector --bind 0.0.0.0:3000
//!
//! curl -F "image=@leaf.jpg" http://localhost:3000/detect-disease
//! ```

use anyhow::Context;
use clap::Parser;
use crop_disease_detector::{app, logging, AppState, Config, GeminiModel};
use std::sync::Arc;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before parsing, so `.env` values feed clap's env fallbacks.
    let _ = dotenvy::dotenv();
    let config = Config::parse();
    logging::init(config.verbose, config.json_logs);

    let api_key = config
        .resolve_api_key()
        .context("GOOGLE_API_KEY must be set (in the environment, a .env file, or --api-key)")?;

    let model = GeminiModel::new(&config.api_base, &api_key, &config.model)
        .with_timeout(config.upstream_timeout());
    let state = AppState::new(Arc::new(model)).with_strict_schema(config.strict_schema);
    let router = app(state, config.max_upload_bytes());

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        model = %config.model,
        strict_schema = config.strict_schema,
        "Crop disease detector listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
