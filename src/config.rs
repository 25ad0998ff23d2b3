use std::env;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::github::AppCredentials;

/// Default Gemini models, tried in this order.
pub const DEFAULT_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.0-flash",
    "gemini-2.5-flash-lite",
    "gemini-2.0-flash-lite",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub github_app: AppCredentials,
    pub gemini_api_key: String,
    pub models: Vec<String>,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let app_id = required("GITHUB_APP_ID")?;
        let private_key = required("GITHUB_APP_PRIVATE_KEY")?;
        let installation_id = required("GITHUB_APP_INSTALLATION_ID")?;
        let gemini_api_key = required("GEMINI_API_KEY")?;

        let github_app = AppCredentials::new(&app_id, &private_key, &installation_id)?;

        let models = env::var("GEMINI_MODELS")
            .ok()
            .map(|v| parse_model_list(&v))
            .filter(|models| !models.is_empty())
            .unwrap_or_else(|| DEFAULT_MODELS.iter().map(|m| m.to_string()).collect());

        let mut pipeline = PipelineConfig::default();

        if let Some(fork_fallback) = env::var("ANALYSIS_FORK_FALLBACK")
            .ok()
            .map(|v| v.to_lowercase() != "false")
        {
            pipeline.fork_fallback = fork_fallback;
        }

        if let Some(max) = env::var("ANALYSIS_MAX_REPOSITORIES")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            pipeline.max_analyzed_repositories = max;
        }

        Ok(Self {
            github_app,
            gemini_api_key,
            models,
            pipeline,
        })
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::Config(format!("{} environment variable not set", name)))
}

fn parse_model_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

/// Multipliers applied to raw model confidences, per evidence source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceWeights {
    pub metadata: f32,
    pub commit: f32,
    pub file: f32,
}

impl Default for ConfidenceWeights {
    fn default() -> Self {
        Self {
            metadata: 0.3,
            commit: 0.6,
            file: 0.8,
        }
    }
}

/// Attempt counts include the first try, and no wait follows the final
/// failure: five repository attempts wait at most 5, 10, 20 and 40 seconds
/// on rate limits.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryTimings {
    pub repository_attempts: u32,
    pub rate_limit_base: Duration,
    pub rate_limit_cap: Duration,
    pub repository_flat_wait: Duration,
    pub repository_pause: Duration,
    pub commit_detail_attempts: u32,
    pub commit_detail_step: Duration,
}

impl Default for RetryTimings {
    fn default() -> Self {
        Self {
            repository_attempts: 5,
            rate_limit_base: Duration::from_secs(5),
            rate_limit_cap: Duration::from_secs(120),
            repository_flat_wait: Duration::from_secs(2),
            repository_pause: Duration::from_millis(500),
            commit_detail_attempts: 3,
            commit_detail_step: Duration::from_secs(1),
        }
    }
}

impl RetryTimings {
    /// Same attempt counts, no waiting.
    pub fn immediate() -> Self {
        Self {
            rate_limit_base: Duration::ZERO,
            rate_limit_cap: Duration::ZERO,
            repository_flat_wait: Duration::ZERO,
            repository_pause: Duration::ZERO,
            commit_detail_step: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Repositories considered in the commit activity scan.
    pub max_scanned_repositories: usize,
    /// GitHub reports repository size in kilobytes.
    pub min_repository_size_kb: u64,
    pub commit_lookback_days: i64,
    pub commit_details_per_repo: usize,
    /// For forks without attributable commits, inspect the most recent
    /// commits regardless of author. This measures exposure to a codebase,
    /// not authorship, so it can report technologies the user never wrote.
    pub fork_fallback: bool,
    pub fork_fallback_commits: usize,
    pub max_analyzed_repositories: usize,
    pub max_files_per_repo: usize,
    pub max_file_size_bytes: u64,
    pub weights: ConfidenceWeights,
    pub inclusion_threshold: f32,
    pub events_per_page: u32,
    pub retry: RetryTimings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_scanned_repositories: 20,
            min_repository_size_kb: 50,
            commit_lookback_days: 365,
            commit_details_per_repo: 5,
            fork_fallback: true,
            fork_fallback_commits: 5,
            max_analyzed_repositories: 10,
            max_files_per_repo: 8,
            max_file_size_bytes: 50 * 1024,
            weights: ConfidenceWeights::default(),
            inclusion_threshold: 0.4,
            events_per_page: 100,
            retry: RetryTimings::default(),
        }
    }
}
