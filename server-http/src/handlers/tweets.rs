use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use shared::Error;
use shared_http::api::{FetchPostsRequest, PostsResponse};
use tracing::info;

/// POST /tweets
pub async fn fetch_posts(
    State(state): State<AppState>,
    payload: Result<Json<FetchPostsRequest>, JsonRejection>,
) -> Result<Json<PostsResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| Error::InvalidRequest(e.body_text()))?;
    fetch(&state, req.handle()).await
}

/// GET /tweets/{handle}
pub async fn fetch_posts_by_path(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Json<PostsResponse>, ApiError> {
    fetch(&state, &handle).await
}

async fn fetch(state: &AppState, handle: &str) -> Result<Json<PostsResponse>, ApiError> {
    info!("FETCH: handle={}", handle.trim());

    let posts = state.gateway()?.fetch_posts(handle).await?;
    Ok(Json(PostsResponse::from(posts)))
}
