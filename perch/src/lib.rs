pub mod auth;
pub mod domain;
pub mod gateway;
pub mod persistence;
pub mod ports;
pub mod retry;
pub mod upstream;

pub use domain::{Author, Handle, Post, UpstreamPost};
pub use gateway::{GatewaySettings, PostGateway};
pub use ports::{PostStore, SocialApi};
