#![deny(clippy::all)]

use crate::domain::{Author, Handle, Post, UpstreamPost};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::Result;

// Ports are the pluggable seams between the gateway and the outside world

/// Port for the persistent post cache (e.g., Sled, Moka)
#[async_trait]
pub trait PostStore: Send + Sync + 'static {
    /// Posts for `handle` with `fetched_at` after `fresh_since`, newest first
    async fn fresh_posts(&self, handle: &Handle, fresh_since: DateTime<Utc>) -> Result<Vec<Post>>;

    /// Insert or overwrite by `id`. A record is never replaced by one with
    /// an older `fetched_at`.
    async fn upsert(&self, posts: &[Post]) -> Result<()>;
}

/// Port for the third-party social API
#[async_trait]
pub trait SocialApi: Send + Sync + 'static {
    async fn lookup_author(&self, handle: &Handle) -> Result<Author>;

    async fn recent_posts(&self, author_id: &str) -> Result<Vec<UpstreamPost>>;
}
