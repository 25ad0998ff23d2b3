use thiserror::Error;

/// HTTP statuses treated as transient upstream failures.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Error, Debug)]
pub enum Error {
    #[error("GitHub API error ({status}): {message}")]
    GitHubApi { status: u16, message: String },

    #[error("GitHub rate limit exceeded, retry after {0} seconds")]
    RateLimited(u64),

    #[error("LLM API error ({}): {message}", describe_status(.status))]
    LLMApi { status: Option<u16>, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("GitHub user not found: {0}")]
    UserNotFound(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Failed to sign GitHub App token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn describe_status(status: &Option<u16>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "no status".to_string())
}

/// Coarse classification used by retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    RateLimited,
    NotFound,
    Fatal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::RateLimited(_) => ErrorKind::RateLimited,
            Error::LLMApi {
                status: Some(429), ..
            } => ErrorKind::RateLimited,
            Error::GitHubApi { status, .. } if RETRYABLE_STATUSES.contains(status) => {
                ErrorKind::Transient
            }
            Error::LLMApi {
                status: Some(status),
                ..
            } if RETRYABLE_STATUSES.contains(status) => ErrorKind::Transient,
            Error::Network(_) => ErrorKind::Transient,
            Error::UserNotFound(_) | Error::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transient | ErrorKind::RateLimited)
    }

    /// Fails the same way on every attempt and every model: rejected
    /// credentials, malformed requests, invalid configuration.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::LLMApi {
                    status: Some(400 | 401 | 403),
                    ..
                }
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind() == ErrorKind::RateLimited
    }

    /// Status a caller-facing handler should answer with.
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::RateLimited => 429,
            _ => 500,
        }
    }
}
