/// Static pre-shared token sent on every upstream call
#[derive(Clone)]
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }
}
