pub mod config;
pub mod error;
pub mod models;
pub mod github;
pub mod llm;
pub mod analysis;
pub mod retry;

#[cfg(test)]
mod testing;

pub use config::{Config, PipelineConfig};
pub use error::{Error, ErrorKind, Result};
pub use github::{GitHubApi, GitHubClient};
pub use llm::{GeminiProvider, LLMProvider, TechnologyExtractor};
pub use analysis::ProfileAnalyzer;
