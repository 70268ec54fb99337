use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use shared::Error;
use shared_http::api::ErrorResponse;
use tracing::{error, warn};

const RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded. Please try again in a few minutes.";

/// HTTP face of `shared::Error`
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Configuration(_)
            | Error::Upstream { .. }
            | Error::Transport(_)
            | Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }

        match self.0 {
            Error::RateLimited { retry_after } => {
                let mut response =
                    (status, Json(ErrorResponse::rate_limited(RATE_LIMIT_MESSAGE))).into_response();
                if let Some(delay) = retry_after {
                    response
                        .headers_mut()
                        .insert(RETRY_AFTER, HeaderValue::from(delay.as_secs()));
                }
                response
            }
            other => (status, Json(ErrorResponse::new(other.to_string()))).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (Error::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (Error::RateLimited { retry_after: None }, StatusCode::TOO_MANY_REQUESTS),
            (Error::Timeout(Duration::from_secs(1)), StatusCode::GATEWAY_TIMEOUT),
            (Error::Configuration("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                Error::Upstream {
                    status: 401,
                    body: "Unauthorized".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (Error::Transport("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (Error::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }

    #[test]
    fn test_rate_limit_response_carries_retry_after() {
        let response = ApiError(Error::RateLimited {
            retry_after: Some(Duration::from_secs(30)),
        })
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "30");
    }
}
