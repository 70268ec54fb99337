// Public API
pub mod bearer;
pub mod oauth1;

pub use bearer::BearerAuth;
pub use oauth1::OAuth1Auth;

use reqwest::{Method, Url};
use shared::Result;
use shared::config::Credentials;

/// Request signing strategy, chosen once when credentials are loaded
#[derive(Clone)]
pub enum Signer {
    Bearer(BearerAuth),
    OAuth1(OAuth1Auth),
}

impl Signer {
    pub fn from_credentials(credentials: &Credentials) -> Self {
        match credentials {
            Credentials::Bearer { token } => Signer::Bearer(BearerAuth::new(token.clone())),
            Credentials::OAuth1 {
                consumer_key,
                consumer_secret,
                access_token,
                access_token_secret,
            } => Signer::OAuth1(OAuth1Auth::new(
                consumer_key.clone(),
                consumer_secret.clone(),
                access_token.clone(),
                access_token_secret.clone(),
            )),
        }
    }

    /// `Authorization` header value for one upstream request
    pub fn authorization(&self, method: &Method, url: &Url) -> Result<String> {
        match self {
            Signer::Bearer(auth) => Ok(auth.authorization()),
            Signer::OAuth1(auth) => auth.authorize(method, url),
        }
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            Signer::Bearer(_) => "bearer",
            Signer::OAuth1(_) => "oauth1",
        }
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Signer").field(&self.strategy()).finish()
    }
}
