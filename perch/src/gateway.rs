use crate::domain::{Handle, Post, normalize};
use crate::ports::{PostStore, SocialApi};
use crate::retry::{RetryPolicy, retry};
use chrono::Utc;
use shared::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct GatewaySettings {
    /// Freshness window for cached posts
    pub cache_ttl: Duration,
    pub lookup_retry: RetryPolicy,
    pub timeline_retry: RetryPolicy,
    /// Default deadline for one invocation; `None` waits indefinitely
    pub deadline: Option<Duration>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            lookup_retry: RetryPolicy::author_lookup(),
            timeline_retry: RetryPolicy::timeline(),
            deadline: None,
        }
    }
}

/// Cache-first post fetching. This is the entry point the HTTP layer calls.
#[derive(Clone)]
pub struct PostGateway {
    store: Arc<dyn PostStore>,
    api: Arc<dyn SocialApi>,
    settings: GatewaySettings,
}

impl PostGateway {
    pub fn new(store: Arc<dyn PostStore>, api: Arc<dyn SocialApi>, settings: GatewaySettings) -> Self {
        Self {
            store,
            api,
            settings,
        }
    }

    pub async fn fetch_posts(&self, handle: &str) -> Result<Vec<Post>> {
        self.fetch_posts_within(handle, self.settings.deadline).await
    }

    /// Same as `fetch_posts` with a caller supplied deadline
    pub async fn fetch_posts_within(
        &self,
        handle: &str,
        deadline: Option<Duration>,
    ) -> Result<Vec<Post>> {
        let handle = Handle::parse(handle)?;

        match deadline {
            Some(limit) => tokio::time::timeout(limit, self.cache_first(&handle))
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => self.cache_first(&handle).await,
        }
    }

    async fn cache_first(&self, handle: &Handle) -> Result<Vec<Post>> {
        let ttl = chrono::Duration::from_std(self.settings.cache_ttl)
            .map_err(|e| Error::Configuration(format!("Invalid cache TTL: {}", e)))?;
        let fresh_since = Utc::now() - ttl;

        let cached = self.store.fresh_posts(handle, fresh_since).await?;
        if !cached.is_empty() {
            let posts = latest_epoch(cached);
            info!("Cache hit for {}: {} posts", handle, posts.len());
            return Ok(posts);
        }

        info!("Cache miss for {}, fetching upstream", handle);
        self.refresh(handle).await
    }

    async fn refresh(&self, handle: &Handle) -> Result<Vec<Post>> {
        let author = retry(&self.settings.lookup_retry, "author lookup", || {
            self.api.lookup_author(handle)
        })
        .await?;
        debug!("Resolved {} to author id {}", handle, author.id);

        let raw = retry(&self.settings.timeline_retry, "timeline listing", || {
            self.api.recent_posts(&author.id)
        })
        .await?;

        let posts = normalize(raw, handle, Utc::now());

        // an empty listing is a valid answer, but never cached as a sentinel
        if !posts.is_empty() {
            self.store.upsert(&posts).await?;
        }

        info!("Fetched {} posts for {}", posts.len(), handle);
        Ok(posts)
    }
}

/// Keep only the most recent fetch batch so a response never mixes epochs
fn latest_epoch(mut posts: Vec<Post>) -> Vec<Post> {
    if let Some(newest) = posts.iter().map(|p| p.fetched_at).max() {
        posts.retain(|p| p.fetched_at == newest);
    }
    posts
}
