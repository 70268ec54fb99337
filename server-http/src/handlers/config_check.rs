use crate::state::{AppState, AuthStatus};
use axum::{Json, extract::State};
use shared_http::api::ConfigStatusResponse;

/// GET /config/twitter
///
/// Reports whether upstream credentials are usable, never their values.
pub async fn twitter_config(State(state): State<AppState>) -> Json<ConfigStatusResponse> {
    let response = match &state.auth {
        AuthStatus::Configured { strategy } => ConfigStatusResponse {
            configured: true,
            strategy: Some(strategy.to_string()),
            error: None,
        },
        AuthStatus::Unconfigured(e) => ConfigStatusResponse {
            configured: false,
            strategy: None,
            error: Some(e.to_string()),
        },
    };

    Json(response)
}
