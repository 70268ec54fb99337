use chrono::{DateTime, Utc};
use perch::Post;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_handle: String,
    pub url: String,
    pub fetched_at: DateTime<Utc>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            content: post.content,
            created_at: post.created_at,
            author_handle: post.author_handle,
            url: post.url,
            fetched_at: post.fetched_at,
        }
    }
}

/// Successful fetch: newest first, possibly empty
#[derive(Debug, Serialize)]
pub struct PostsResponse {
    pub data: Vec<PostResponse>,
}

impl From<Vec<Post>> for PostsResponse {
    fn from(posts: Vec<Post>) -> Self {
        Self {
            data: posts.into_iter().map(PostResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_rate_limit: Option<bool>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            is_rate_limit: None,
        }
    }

    pub fn rate_limited(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            is_rate_limit: Some(true),
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub message: String,
}

/// Credential presence check; secrets are never echoed
#[derive(Debug, Serialize)]
pub struct ConfigStatusResponse {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
