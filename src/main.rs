use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geoquest::{api, broadcast, config::ServerConfig, llm, rate_limit, state::AppState};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geoquest=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting GeoQuest...");

    let config = ServerConfig::from_env();
    let rate_limit_config = Arc::new(rate_limit::RateLimitConfig::from_env());

    // Initialize LLM providers
    let llm_config = llm::LlmConfig::from_env();
    let llm_manager = match llm_config.build_manager() {
        Ok(manager) => {
            tracing::info!("LLM providers initialized successfully");
            Some(manager)
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize LLM providers: {}. AI generation will not be available.",
                e
            );
            None
        }
    };

    let state = Arc::new(AppState::with_config(config.game.clone(), llm_manager));

    if let Some(ref path) = config.data_file {
        match state.load_from_file(path).await {
            Ok(true) => tracing::info!("Restored state from {}", path.display()),
            Ok(false) => tracing::info!("No snapshot at {}, starting empty", path.display()),
            Err(e) => {
                tracing::error!("Failed to restore state: {}", e);
                std::process::exit(1);
            }
        }
    }

    // Spawn background task for broadcasting room stats to WebSocket clients
    broadcast::spawn_room_stats_broadcaster(state.clone());
    rate_limit::spawn_cleanup(rate_limit_config.clone());

    let app = api::app(state.clone(), rate_limit_config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    if let Some(ref path) = config.data_file {
        if let Err(e) = state.save_to_file(path).await {
            tracing::error!("Failed to save state snapshot: {}", e);
        }
    }
    tracing::info!("GeoQuest stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
