use crate::{Error, Result};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const BEARER_TOKEN_VAR: &str = "TWITTER_BEARER_TOKEN";
pub const CONSUMER_KEY_VAR: &str = "TWITTER_CONSUMER_KEY";
pub const CONSUMER_SECRET_VAR: &str = "TWITTER_CONSUMER_SECRET";
pub const ACCESS_TOKEN_VAR: &str = "TWITTER_ACCESS_TOKEN";
pub const ACCESS_TOKEN_SECRET_VAR: &str = "TWITTER_ACCESS_TOKEN_SECRET";
pub const AUTH_STRATEGY_VAR: &str = "TWITTER_AUTH_STRATEGY";

const OAUTH1_VARS: [&str; 4] = [
    CONSUMER_KEY_VAR,
    CONSUMER_SECRET_VAR,
    ACCESS_TOKEN_VAR,
    ACCESS_TOKEN_SECRET_VAR,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Sled,
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub http_port: u16,
    pub data_dir: String,
    pub store: StoreBackend,
    pub cache_ttl: Duration,
    pub request_timeout: Option<Duration>,
    pub max_retry_delay: Duration,
    pub allowed_origins: Vec<String>,
    pub api_base_url: String,
    pub max_results: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            http_port: Self::DEFAULT_HTTP_PORT,
            data_dir: Self::DEFAULT_DATA_DIR.to_string(),
            store: StoreBackend::Sled,
            cache_ttl: Duration::from_secs(Self::DEFAULT_CACHE_TTL_SECS),
            request_timeout: None,
            max_retry_delay: Duration::from_secs(Self::DEFAULT_MAX_RETRY_DELAY_SECS),
            allowed_origins: vec!["*".to_string()],
            api_base_url: Self::DEFAULT_API_BASE_URL.to_string(),
            max_results: Self::DEFAULT_MAX_RESULTS as u8,
        }
    }
}

impl Config {
    const DEFAULT_HOST: &str = "0.0.0.0";
    const DEFAULT_HTTP_PORT: u16 = 8080;
    const DEFAULT_DATA_DIR: &str = "./data";
    const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
    const DEFAULT_MAX_RETRY_DELAY_SECS: u64 = 120;
    const DEFAULT_API_BASE_URL: &str = "https://api.twitter.com";
    const DEFAULT_MAX_RESULTS: u16 = 10;

    pub fn from_env() -> Self {
        let store = match std::env::var("PERCH_STORE")
            .unwrap_or_else(|_| "sled".to_string())
            .to_lowercase()
            .as_str()
        {
            "sled" => StoreBackend::Sled,
            "memory" => StoreBackend::Memory,
            other => {
                warn!("Unknown PERCH_STORE '{}', falling back to sled", other);
                StoreBackend::Sled
            }
        };

        let timeout_secs: u64 = parse_var("PERCH_REQUEST_TIMEOUT_SECS", 0);

        Self {
            host: std::env::var("PERCH_HOST").unwrap_or_else(|_| Self::DEFAULT_HOST.to_string()),
            http_port: parse_var("PERCH_HTTP_PORT", Self::DEFAULT_HTTP_PORT),
            data_dir: std::env::var("PERCH_DATA_DIR")
                .unwrap_or_else(|_| Self::DEFAULT_DATA_DIR.to_string()),
            store,
            cache_ttl: Duration::from_secs(parse_var(
                "PERCH_CACHE_TTL_SECS",
                Self::DEFAULT_CACHE_TTL_SECS,
            )),
            request_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            max_retry_delay: Duration::from_secs(parse_var(
                "PERCH_MAX_RETRY_DELAY_SECS",
                Self::DEFAULT_MAX_RETRY_DELAY_SECS,
            )),
            allowed_origins: std::env::var("PERCH_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            api_base_url: std::env::var("TWITTER_API_BASE_URL")
                .unwrap_or_else(|_| Self::DEFAULT_API_BASE_URL.to_string()),
            // the timeline endpoint rejects anything outside 5..=100
            max_results: parse_var("TWITTER_MAX_RESULTS", Self::DEFAULT_MAX_RESULTS).clamp(5, 100) as u8,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn parse_var<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("Invalid {} value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

/// Upstream API credentials. Exactly one strategy is chosen at load time.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Bearer {
        token: String,
    },
    OAuth1 {
        consumer_key: String,
        consumer_secret: String,
        access_token: String,
        access_token_secret: String,
    },
}

impl std::fmt::Debug for Credentials {
    // secrets stay out of logs
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("strategy", &self.strategy())
            .finish_non_exhaustive()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve credentials through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        match get(AUTH_STRATEGY_VAR).map(|s| s.to_lowercase()).as_deref() {
            Some("bearer") => Self::bearer(&get),
            Some("oauth1") => Self::oauth1(&get),
            Some(other) => Err(Error::Configuration(format!(
                "{} must be 'bearer' or 'oauth1', got '{}'",
                AUTH_STRATEGY_VAR, other
            ))),
            None => {
                let any_oauth1 = OAUTH1_VARS.iter().any(|key| get(key).is_some());
                let has_bearer = get(BEARER_TOKEN_VAR).is_some();

                match (has_bearer, any_oauth1) {
                    (true, true) => {
                        // an incomplete OAuth1 set is reported first
                        Self::oauth1(&get)?;
                        Err(Error::Configuration(format!(
                            "both {} and OAuth1 credentials are set; choose one with {}",
                            BEARER_TOKEN_VAR, AUTH_STRATEGY_VAR
                        )))
                    }
                    (false, true) => Self::oauth1(&get),
                    _ => Self::bearer(&get),
                }
            }
        }
    }

    fn bearer(get: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Credentials::Bearer {
            token: require(get, BEARER_TOKEN_VAR)?,
        })
    }

    fn oauth1(get: &impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Credentials::OAuth1 {
            consumer_key: require(get, CONSUMER_KEY_VAR)?,
            consumer_secret: require(get, CONSUMER_SECRET_VAR)?,
            access_token: require(get, ACCESS_TOKEN_VAR)?,
            access_token_secret: require(get, ACCESS_TOKEN_SECRET_VAR)?,
        })
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            Credentials::Bearer { .. } => "bearer",
            Credentials::OAuth1 { .. } => "oauth1",
        }
    }
}

fn require(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    get(key).ok_or_else(|| {
        Error::Configuration(format!("{} environment variable is not configured", key))
    })
}
