pub mod config_check;
pub mod health;
pub mod tweets;

pub use config_check::twitter_config;
pub use health::health_check;
pub use tweets::{fetch_posts, fetch_posts_by_path};
