use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{CommitDetail, CommitSummary, FileContent, GitHubEvent, Repository, RepositoryTree};

/// Read access to GitHub used by the profile analyzer.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Public repositories owned by `username`. Fails with
    /// [`Error::UserNotFound`](crate::Error::UserNotFound) for unknown users.
    async fn get_user_repositories(&self, username: &str) -> Result<Vec<Repository>>;

    async fn get_repository_commits(
        &self,
        owner: &str,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CommitSummary>>;

    async fn get_commit_details(&self, owner: &str, repo: &str, sha: &str) -> Result<CommitDetail>;

    async fn get_file_content(&self, owner: &str, repo: &str, path: &str) -> Result<FileContent>;

    async fn get_repository_tree(&self, owner: &str, repo: &str, sha: &str) -> Result<RepositoryTree>;

    async fn get_repository_languages(&self, owner: &str, repo: &str) -> Result<HashMap<String, u64>>;

    /// Contribution-relevant public events, newest first.
    async fn get_user_events(&self, username: &str, per_page: u32) -> Result<Vec<GitHubEvent>>;
}
