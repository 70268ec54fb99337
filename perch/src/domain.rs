use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{Error, Result};
use std::collections::HashSet;
use std::fmt;

const MAX_HANDLE_LEN: usize = 15;
const STATUS_URL_BASE: &str = "https://twitter.com/i/web/status";

/// A validated, lowercased platform username.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Handle(String);

impl Handle {
    /// Accepts `name`, `@name` and surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let name = trimmed.strip_prefix('@').unwrap_or(trimmed);

        if name.is_empty() {
            return Err(Error::InvalidRequest("handle is required".to_string()));
        }

        if name.len() > MAX_HANDLE_LEN {
            return Err(Error::InvalidRequest(format!(
                "handle '{}' is longer than {} characters",
                name, MAX_HANDLE_LEN
            )));
        }

        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::InvalidRequest(format!(
                "handle '{}' may only contain letters, digits and underscores",
                name
            )));
        }

        Ok(Self(name.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized post returned to callers and stored in the cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_handle: String,
    pub url: String,
    pub fetched_at: DateTime<Utc>,
}

impl Post {
    pub fn url_for(id: &str) -> String {
        format!("{}/{}", STATUS_URL_BASE, id)
    }

    pub fn from_upstream(raw: UpstreamPost, handle: &Handle, fetched_at: DateTime<Utc>) -> Self {
        // upstream clocks may run ahead; fetched_at >= created_at must hold
        let created_at = raw
            .created_at
            .map(|created| created.min(fetched_at))
            .unwrap_or(fetched_at);

        Self {
            url: Self::url_for(&raw.id),
            id: raw.id,
            content: raw.text,
            created_at,
            author_handle: handle.as_str().to_string(),
            fetched_at,
        }
    }

    pub fn is_fresh(&self, fresh_since: DateTime<Utc>) -> bool {
        self.fetched_at > fresh_since
    }
}

/// Newest first, ties broken by id so every store yields the same order.
pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

/// Map an upstream listing to posts: dedup by id (first wins), stamp, order.
pub fn normalize(raw: Vec<UpstreamPost>, handle: &Handle, fetched_at: DateTime<Utc>) -> Vec<Post> {
    let mut seen = HashSet::new();
    let mut posts: Vec<Post> = raw
        .into_iter()
        .filter(|p| seen.insert(p.id.clone()))
        .map(|p| Post::from_upstream(p, handle, fetched_at))
        .collect();

    sort_newest_first(&mut posts);
    posts
}

/// Result of resolving a handle to a stable author id.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
}

/// Post as listed by the upstream API.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct UpstreamPost {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
