use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    http::{
        HeaderName, HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};
use shared::config::Config;
use tower::Layer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Build and configure the application router
pub fn build_router(state: AppState, config: &Config) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Credential presence check
        .route("/config/twitter", get(handlers::twitter_config))
        // Post fetching
        .route("/tweets", post(handlers::fetch_posts))
        .route("/tweets/{handle}", get(handlers::fetch_posts_by_path))
        // Middleware
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router wrapped so trailing slashes are trimmed before routing
pub fn build_app(state: AppState, config: &Config) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(build_router(state, config))
}

fn cors_layer(config: &Config) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ]);

    if config.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}
