use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use perch::domain::sort_newest_first;
use perch::{Handle, Post, PostStore};
use shared::Result;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Moka-based post cache for deployments without a data directory
///
/// Entries are keyed by author handle and hold that author's records. Moka's
/// time-to-live evicts whole authors after `ttl`; freshness is still checked
/// per record on read.
#[derive(Clone)]
pub struct MokaPostStore {
    cache: Cache<String, Arc<Vec<Post>>>,
}

impl MokaPostStore {
    pub fn new(ttl: Duration, max_authors: u64) -> Self {
        let cache = Cache::builder()
            .name("posts")
            .max_capacity(max_authors)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }
}

// Replace records with the same id unless the stored one was fetched later
fn merge(existing: Option<&Vec<Post>>, batch: Vec<Post>) -> Vec<Post> {
    let mut merged = existing.cloned().unwrap_or_default();
    for post in batch {
        match merged.iter_mut().find(|p| p.id == post.id) {
            Some(slot) if slot.fetched_at > post.fetched_at => {}
            Some(slot) => *slot = post,
            None => merged.push(post),
        }
    }
    merged
}

#[async_trait]
impl PostStore for MokaPostStore {
    async fn fresh_posts(&self, handle: &Handle, fresh_since: DateTime<Utc>) -> Result<Vec<Post>> {
        let Some(records) = self.cache.get(handle.as_str()).await else {
            return Ok(Vec::new());
        };

        let mut posts: Vec<Post> = records
            .iter()
            .filter(|p| p.is_fresh(fresh_since))
            .cloned()
            .collect();
        sort_newest_first(&mut posts);
        Ok(posts)
    }

    async fn upsert(&self, posts: &[Post]) -> Result<()> {
        let mut by_author: HashMap<String, Vec<Post>> = HashMap::new();
        for post in posts {
            by_author
                .entry(post.author_handle.clone())
                .or_default()
                .push(post.clone());
        }

        for (author, batch) in by_author {
            debug!("Caching {} posts for {}", batch.len(), author);
            self.cache
                .entry(author)
                .and_upsert_with(|existing| {
                    let merged = merge(existing.as_ref().map(|e| e.value().as_ref()), batch);
                    std::future::ready(Arc::new(merged))
                })
                .await;
        }

        Ok(())
    }
}

impl Debug for MokaPostStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaPostStore")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}
