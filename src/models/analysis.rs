use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::{ContributionActivity, ContributionSummary};
use super::technology::TechnologyProfile;

/// A fetched file, held only until it has been passed to the extractor.
#[derive(Debug, Clone)]
pub struct CodeFile {
    pub name: String,
    pub path: String,
    pub content: String,
    pub size: u64,
}

impl CodeFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into();
        let content = content.into();
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        let size = content.len() as u64;
        Self {
            name,
            path,
            content,
            size,
        }
    }
}

/// Metadata-only evidence for the cheaper repository-level extraction.
#[derive(Debug, Clone, Default)]
pub struct RepositorySummary {
    pub name: String,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub languages: Vec<String>,
    pub key_files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedRepository {
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub url: String,
    pub size: u64,
    pub attributed_commits: usize,
    pub files_analyzed: usize,
    pub technologies: TechnologyProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubProfileAnalysis {
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    pub repository_count: usize,
    pub repositories: Vec<AnalyzedRepository>,
    pub technologies: TechnologyProfile,
    pub contribution_activity: Vec<ContributionActivity>,
    pub contribution_summary: ContributionSummary,
    pub analyzed_at: DateTime<Utc>,
}
