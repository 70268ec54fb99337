pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export key types
pub use error::ApiError;
pub use routes::{build_app, build_router};
pub use state::{AppState, AuthStatus};

#[cfg(test)]
mod contract_tests;
