use serde::Deserialize;

/// Request body for `POST /tweets`
///
/// The handle is optional at the wire level so a missing field surfaces as
/// an invalid-request error from the gateway rather than a decode failure.
#[derive(Debug, Default, Deserialize)]
pub struct FetchPostsRequest {
    #[serde(default, alias = "username")]
    pub handle: Option<String>,
}

impl FetchPostsRequest {
    pub fn handle(&self) -> &str {
        self.handle.as_deref().unwrap_or_default()
    }
}
