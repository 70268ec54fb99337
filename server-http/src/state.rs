use perch::auth::Signer;
use perch::upstream::TwitterClient;
use perch::{GatewaySettings, PostGateway, PostStore};
use shared::config::{Config, Credentials};
use shared::{Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Whether upstream credentials were usable at startup
#[derive(Clone, Debug)]
pub enum AuthStatus {
    Configured { strategy: &'static str },
    Unconfigured(Error),
}

/// Server state shared across handlers
#[derive(Clone)]
pub struct AppState {
    gateway: Option<Arc<PostGateway>>,
    pub auth: AuthStatus,
}

impl AppState {
    /// Wire the gateway from loaded config. A credential problem does not stop
    /// the server: the config endpoint reports it and fetches fail fast.
    pub fn new(config: &Config, credentials: Result<Credentials>, store: Arc<dyn PostStore>) -> Self {
        let client = credentials.and_then(|credentials| {
            let signer = Signer::from_credentials(&credentials);
            TwitterClient::new(&config.api_base_url, signer, config.max_results)
        });

        match client {
            Ok(client) => {
                let strategy = client.strategy();
                info!("Upstream client ready ({} auth)", strategy);
                let gateway = PostGateway::new(store, Arc::new(client), settings(config));
                Self::with_gateway(gateway, strategy)
            }
            Err(e) => {
                warn!("Upstream client unavailable: {}", e);
                Self::unconfigured(e)
            }
        }
    }

    pub fn with_gateway(gateway: PostGateway, strategy: &'static str) -> Self {
        Self {
            gateway: Some(Arc::new(gateway)),
            auth: AuthStatus::Configured { strategy },
        }
    }

    pub fn unconfigured(error: Error) -> Self {
        Self {
            gateway: None,
            auth: AuthStatus::Unconfigured(error),
        }
    }

    pub fn gateway(&self) -> Result<&PostGateway> {
        match (&self.gateway, &self.auth) {
            (Some(gateway), _) => Ok(gateway),
            (None, AuthStatus::Unconfigured(e)) => Err(e.clone()),
            (None, AuthStatus::Configured { .. }) => Err(Error::Configuration(
                "upstream client is not initialized".to_string(),
            )),
        }
    }
}

fn settings(config: &Config) -> GatewaySettings {
    let defaults = GatewaySettings::default();
    GatewaySettings {
        cache_ttl: config.cache_ttl,
        lookup_retry: defaults.lookup_retry.with_max_delay(config.max_retry_delay),
        timeline_retry: defaults.timeline_retry.with_max_delay(config.max_retry_delay),
        deadline: config.request_timeout,
    }
}
