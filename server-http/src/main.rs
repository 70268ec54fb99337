use axum::ServiceExt;
use axum::extract::Request;
use perch::PostStore;
use perch::persistence::SledPostStore;
use server_http::{AppState, build_app};
use shared::config::{Config, Credentials, StoreBackend};
use std::path::Path;
use std::sync::Arc;
use storage_engine::MokaPostStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const MAX_CACHED_AUTHORS: u64 = 10_000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file (if exists)
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Perch HTTP Server...");
    match dotenv {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env();
    let store = open_store(&config);
    let state = AppState::new(&config, Credentials::from_env(), store);
    let app = build_app(state, &config);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!("HTTP Server listening on http://{}", address);
    info!("Try: curl http://localhost:{}/tweets/jack", config.http_port);

    // Graceful shutdown handler
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Sled when configured, falling back to in-memory if the database can't be opened
fn open_store(config: &Config) -> Arc<dyn PostStore> {
    let memory = || -> Arc<dyn PostStore> {
        Arc::new(MokaPostStore::new(config.cache_ttl, MAX_CACHED_AUTHORS))
    };

    match config.store {
        StoreBackend::Memory => {
            info!("Using in-memory post cache");
            memory()
        }
        StoreBackend::Sled => {
            let path = Path::new(&config.data_dir).join("posts.sled");
            match SledPostStore::new(&path) {
                Ok(store) => {
                    info!("Post cache persisted at {}", path.display());
                    Arc::new(store)
                }
                Err(e) => {
                    warn!("Failed to open post cache: {}. Running in-memory mode.", e);
                    memory()
                }
            }
        }
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
