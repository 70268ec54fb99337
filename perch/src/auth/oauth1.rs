use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Method, Url};
use sha1::Sha1;
use shared::{Error, Result};

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

/// OAuth 1.0a user-context signing (HMAC-SHA1)
#[derive(Clone)]
pub struct OAuth1Auth {
    consumer_key: String,
    consumer_secret: String,
    token: String,
    token_secret: String,
}

impl OAuth1Auth {
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        token: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            token: token.into(),
            token_secret: token_secret.into(),
        }
    }

    /// Sign a request with a fresh nonce and the current Unix time
    pub fn authorize(&self, method: &Method, url: &Url) -> Result<String> {
        self.authorize_with(method, url, &[], &generate_nonce(), Utc::now().timestamp())
    }

    /// Deterministic signing. `extra` carries form body parameters, if any;
    /// query parameters are taken from `url`.
    pub fn authorize_with(
        &self,
        method: &Method,
        url: &Url,
        extra: &[(&str, &str)],
        nonce: &str,
        timestamp: i64,
    ) -> Result<String> {
        let mut oauth_params = vec![
            ("oauth_consumer_key".to_string(), self.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            (
                "oauth_signature_method".to_string(),
                SIGNATURE_METHOD.to_string(),
            ),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_token".to_string(), self.token.clone()),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
        ];

        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        params.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        params.extend(oauth_params.iter().cloned());

        let base = signature_base_string(method.as_str(), url, &params);
        let signature = sign(&base, &self.signing_key())?;

        oauth_params.push(("oauth_signature".to_string(), signature));
        Ok(authorization_header(&oauth_params))
    }

    fn signing_key(&self) -> String {
        signing_key(&self.consumer_secret, &self.token_secret)
    }
}

/// RFC 3986 encoding: everything but `A-Z a-z 0-9 - . _ ~` is escaped
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Scheme and host lowercased, default port dropped, query and fragment removed
pub fn normalized_url(url: &Url) -> String {
    let scheme = url.scheme().to_ascii_lowercase();
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

    match url.port() {
        Some(port) => format!("{}://{}:{}{}", scheme, host, port, url.path()),
        None => format!("{}://{}{}", scheme, host, url.path()),
    }
}

/// Encoded `k=v` pairs sorted by key, then value, joined with `&`
pub fn parameter_string(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn signature_base_string(method: &str, url: &Url, params: &[(String, String)]) -> String {
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&normalized_url(url)),
        percent_encode(&parameter_string(params))
    )
}

pub fn signing_key(consumer_secret: &str, token_secret: &str) -> String {
    format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    )
}

/// Base64 of HMAC-SHA1(key, base)
pub fn sign(base: &str, key: &str) -> Result<String> {
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| Error::Configuration(format!("Invalid OAuth1 signing key: {}", e)))?;
    mac.update(base.as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// `OAuth k="v", ...` with keys sorted
pub fn authorization_header(params: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    format!("OAuth {}", joined)
}

/// 16 random bytes, hex encoded
pub fn generate_nonce() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..16).map(|_| rng.random()).collect();

    bytes.iter().map(|b| format!("{:02x}", b)).collect::<String>()
}
