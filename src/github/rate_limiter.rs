use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::header::HeaderMap;
use tokio::time::sleep;

/// Tracks the primary rate limit from GitHub response headers and holds
/// requests back once the budget is spent.
pub struct RateLimiter {
    state: Mutex<RateLimitState>,
}

#[derive(Default)]
struct RateLimitState {
    remaining: Option<u32>,
    reset_at: Option<Instant>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RateLimitState::default()),
        }
    }

    pub async fn wait(&self) {
        let wait_duration = {
            let state = match self.state.lock() {
                Ok(state) => state,
                Err(poisoned) => poisoned.into_inner(),
            };
            match (state.remaining, state.reset_at) {
                (Some(0), Some(reset_at)) => reset_at.checked_duration_since(Instant::now()),
                _ => None,
            }
        };

        if let Some(wait_duration) = wait_duration {
            tracing::info!("GitHub rate limit exhausted, waiting {:?}", wait_duration);
            sleep(wait_duration).await;
        }
    }

    pub fn update_from_headers(&self, headers: &HeaderMap) {
        let remaining = header_value::<u32>(headers, "x-ratelimit-remaining");
        let reset = header_value::<u64>(headers, "x-ratelimit-reset");

        if remaining.is_none() && reset.is_none() {
            return;
        }

        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if remaining.is_some() {
            state.remaining = remaining;
        }
        if let Some(reset) = reset {
            state.reset_at = Some(Instant::now() + seconds_until(reset));
        }
    }

    /// Seconds until the tracked budget resets, used as a retry hint.
    pub fn seconds_until_reset(&self) -> u64 {
        let state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state
            .reset_at
            .and_then(|reset_at| reset_at.checked_duration_since(Instant::now()))
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    pub fn remaining(&self) -> Option<u32> {
        match self.state.lock() {
            Ok(state) => state.remaining,
            Err(poisoned) => poisoned.into_inner().remaining,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

fn header_value<T: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn seconds_until(reset_timestamp: u64) -> Duration {
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    Duration::from_secs(reset_timestamp.saturating_sub(now))
}
