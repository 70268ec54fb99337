use crate::auth::Signer;
use crate::domain::{Author, Handle, UpstreamPost};
use crate::ports::SocialApi;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{AUTHORIZATION, HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use shared::{Error, Result};
use std::time::Duration;
use tracing::debug;

const RATE_LIMIT_RESET: &str = "x-rate-limit-reset";

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

/// Twitter API v2 client
#[derive(Clone, Debug)]
pub struct TwitterClient {
    http: Client,
    base_url: Url,
    signer: Signer,
    max_results: u8,
}

impl TwitterClient {
    pub fn new(base_url: &str, signer: Signer, max_results: u8) -> Result<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| {
            Error::Configuration(format!("Invalid API base URL '{}': {}", base_url, e))
        })?;

        // endpoints join relative to the base path
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http: Client::new(),
            base_url,
            signer,
            max_results,
        })
    }

    pub fn strategy(&self) -> &'static str {
        self.signer.strategy()
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Configuration(format!("Invalid endpoint '{}': {}", path, e)))
    }

    /// Signed GET; returns the status and raw body of a 2xx response
    async fn get(&self, url: Url) -> Result<(StatusCode, String)> {
        let authorization = self.signer.authorization(&Method::GET, &url)?;

        let response = self
            .http
            .get(url.clone())
            .header(AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("GET {} failed: {}", url.path(), e)))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("Failed to read response body: {}", e)))?;

        debug!("GET {} -> {}", url.path(), status);

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited {
                retry_after: retry_after(&headers),
            });
        }

        if !status.is_success() {
            return Err(Error::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok((status, body))
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<Envelope<T>> {
    serde_json::from_str(body)
        .map_err(|e| Error::Transport(format!("Failed to decode upstream response: {}", e)))
}

/// `retry-after` seconds, else the time until a future `x-rate-limit-reset` epoch
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let header_u64 = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
    };

    if let Some(secs) = header_u64(RETRY_AFTER.as_str()) {
        return Some(Duration::from_secs(secs));
    }

    // a reset already in the past carries no usable hint
    let now = Utc::now().timestamp().max(0) as u64;
    header_u64(RATE_LIMIT_RESET)
        .map(|reset| reset.saturating_sub(now))
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

#[async_trait]
impl SocialApi for TwitterClient {
    async fn lookup_author(&self, handle: &Handle) -> Result<Author> {
        let url = self.endpoint(&format!("2/users/by/username/{}", handle))?;
        let (status, body) = self.get(url).await?;

        // unknown users come back as 2xx with an `errors` array and no `data`
        decode::<Author>(&body)?.data.ok_or(Error::Upstream {
            status: status.as_u16(),
            body,
        })
    }

    async fn recent_posts(&self, author_id: &str) -> Result<Vec<UpstreamPost>> {
        let mut url = self.endpoint(&format!(
            "2/users/{}/tweets",
            urlencoding::encode(author_id)
        ))?;
        url.query_pairs_mut()
            .append_pair("tweet.fields", "created_at,text")
            .append_pair("max_results", &self.max_results.to_string());

        let (_, body) = self.get(url).await?;

        // no `data` means no recent posts
        Ok(decode::<Vec<UpstreamPost>>(&body)?.data.unwrap_or_default())
    }
}
