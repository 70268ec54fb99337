use crate::{AppState, build_app};
use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use chrono::{TimeZone, Utc};
use perch::{Author, GatewaySettings, Handle, PostGateway, SocialApi, UpstreamPost};
use serde_json::{Value, json};
use shared::config::{Config, Credentials};
use shared::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use storage_engine::MokaPostStore;
use tower::ServiceExt;

#[derive(Clone, Copy)]
enum Behaviour {
    Posts,
    RateLimited,
    Unauthorized,
    Slow,
}

struct StubApi {
    behaviour: Behaviour,
    lookups: AtomicU32,
}

#[async_trait]
impl SocialApi for StubApi {
    async fn lookup_author(&self, handle: &Handle) -> Result<Author> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            Behaviour::Posts => {}
            Behaviour::RateLimited => {
                return Err(Error::RateLimited {
                    retry_after: Some(Duration::ZERO),
                });
            }
            Behaviour::Unauthorized => {
                return Err(Error::Upstream {
                    status: 401,
                    body: "Unauthorized".to_string(),
                });
            }
            Behaviour::Slow => tokio::time::sleep(Duration::from_secs(30)).await,
        }
        Ok(Author {
            id: "42".to_string(),
            username: handle.to_string(),
        })
    }

    async fn recent_posts(&self, _author_id: &str) -> Result<Vec<UpstreamPost>> {
        Ok(vec![
            UpstreamPost {
                id: "2".to_string(),
                text: "second".to_string(),
                created_at: Some(Utc.with_ymd_and_hms(2024, 5, 2, 9, 0, 0).unwrap()),
            },
            UpstreamPost {
                id: "1".to_string(),
                text: "first".to_string(),
                created_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()),
            },
        ])
    }
}

fn test_state(behaviour: Behaviour, deadline: Option<Duration>) -> (AppState, Arc<StubApi>) {
    let api = Arc::new(StubApi {
        behaviour,
        lookups: AtomicU32::new(0),
    });
    let store = Arc::new(MokaPostStore::new(Duration::from_secs(3600), 100));
    let settings = GatewaySettings {
        deadline,
        ..Default::default()
    };
    let gateway = PostGateway::new(store, api.clone(), settings);
    (AppState::with_gateway(gateway, "bearer"), api)
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
    let app = build_app(state, &Config::default());
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_contract() {
    let (state, _) = test_state(Behaviour::Posts, None);

    let (status, body) = send(state.clone(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "OK"}));

    let (status, _) = send(state, get("/health/")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn post_tweets_contract() {
    let (state, api) = test_state(Behaviour::Posts, None);

    let (status, body) = send(state, post_json("/tweets", r#"{"handle":"@SomeOne"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["id"], "2");
    assert_eq!(data[0]["content"], "second");
    assert_eq!(data[0]["authorHandle"], "someone");
    assert_eq!(data[0]["url"], "https://twitter.com/i/web/status/2");
    assert_eq!(data[0]["createdAt"], "2024-05-02T09:00:00Z");
    assert!(data[0]["fetchedAt"].is_string());
    assert_eq!(api.lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn post_tweets_accepts_username_alias() {
    let (state, _) = test_state(Behaviour::Posts, None);

    let (status, body) = send(state, post_json("/tweets", r#"{"username":"someone"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn get_tweets_is_served_from_cache_on_repeat() {
    let (state, api) = test_state(Behaviour::Posts, None);

    let (status, first) = send(state.clone(), get("/tweets/someone")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, second) = send(state, get("/tweets/someone")).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(first, second);
    assert_eq!(api.lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_handle_is_bad_request() {
    let (state, api) = test_state(Behaviour::Posts, None);

    let (status, body) = send(state, post_json("/tweets", "{}")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("handle"));
    assert!(body.get("data").is_none());
    assert_eq!(api.lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let (state, _) = test_state(Behaviour::Posts, None);

    let (status, body) = send(state.clone(), post_json("/tweets", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let no_content_type = Request::builder()
        .method("POST")
        .uri("/tweets")
        .body(Body::from(r#"{"handle":"someone"}"#))
        .unwrap();
    let (status, _) = send(state, no_content_type).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_path_handle_is_bad_request() {
    let (state, _) = test_state(Behaviour::Posts, None);

    let (status, body) = send(state, get("/tweets/not-a-handle")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn rate_limit_contract() {
    let (state, api) = test_state(Behaviour::RateLimited, None);

    let (status, body) = send(state, post_json("/tweets", r#"{"handle":"someone"}"#)).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        body,
        json!({
            "error": "Rate limit exceeded. Please try again in a few minutes.",
            "isRateLimit": true
        })
    );
    assert_eq!(api.lookups.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn upstream_error_contract() {
    let (state, _) = test_state(Behaviour::Unauthorized, None);

    let (status, body) = send(state, post_json("/tweets", r#"{"handle":"someone"}"#)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("401"));
    assert!(error.contains("Unauthorized"));
    assert!(body.get("isRateLimit").is_none());
}

#[tokio::test(start_paused = true)]
async fn deadline_contract() {
    let (state, _) = test_state(Behaviour::Slow, Some(Duration::from_secs(1)));

    let (status, body) = send(state, get("/tweets/someone")).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn missing_credentials_contract() {
    let err = Credentials::from_lookup(|_| None).unwrap_err();
    let state = AppState::unconfigured(err);

    let (status, body) = send(state.clone(), get("/config/twitter")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["configured"], false);
    assert!(body.get("strategy").is_none());
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("TWITTER_BEARER_TOKEN")
    );

    let (status, body) = send(state, post_json("/tweets", r#"{"handle":"someone"}"#)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("TWITTER_BEARER_TOKEN")
    );
}

#[tokio::test]
async fn configured_credentials_contract() {
    let (state, _) = test_state(Behaviour::Posts, None);

    let (status, body) = send(state, get("/config/twitter")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"configured": true, "strategy": "bearer"}));
}

#[tokio::test]
async fn app_state_from_config_reports_strategy() {
    let config = Config::default();
    let credentials = Ok(Credentials::Bearer {
        token: "token".to_string(),
    });
    let store = Arc::new(MokaPostStore::new(config.cache_ttl, 100));

    let state = AppState::new(&config, credentials, store);

    let (_, body) = send(state, get("/config/twitter")).await;
    assert_eq!(body, json!({"configured": true, "strategy": "bearer"}));
}

#[tokio::test]
async fn cors_preflight_contract() {
    let (state, _) = test_state(Behaviour::Posts, None);
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/tweets")
        .header(header::ORIGIN, "https://portfolio.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type,apikey")
        .body(Body::empty())
        .unwrap();

    let app = build_app(state, &Config::default());
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let allowed = headers[header::ACCESS_CONTROL_ALLOW_HEADERS].to_str().unwrap();
    assert!(allowed.contains("apikey"));
    assert!(allowed.contains("x-client-info"));
}
