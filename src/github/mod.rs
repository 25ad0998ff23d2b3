pub mod api;
pub mod auth;
pub mod client;
pub mod content;
pub mod paginator;
pub mod rate_limiter;

pub use api::GitHubApi;
pub use auth::AppCredentials;
pub use client::GitHubClient;
pub use content::decode_file_content;
pub use paginator::Paginator;
pub use rate_limiter::RateLimiter;
