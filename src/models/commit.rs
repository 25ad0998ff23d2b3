use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Item of `GET /repos/{owner}/{repo}/commits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    pub commit: CommitDetails,
    /// Linked GitHub account, absent when the commit email is unknown to GitHub.
    pub author: Option<CommitAuthorInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDetails {
    #[serde(default)]
    pub message: String,
    pub author: Option<CommitAuthor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitAuthor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitAuthorInfo {
    pub login: String,
}

impl CommitSummary {
    pub fn author_name(&self) -> &str {
        self.commit.author.as_ref().map(|a| a.name.as_str()).unwrap_or("")
    }

    pub fn author_email(&self) -> &str {
        self.commit.author.as_ref().map(|a| a.email.as_str()).unwrap_or("")
    }

    pub fn author_login(&self) -> Option<&str> {
        self.author.as_ref().map(|a| a.login.as_str())
    }

    pub fn authored_at(&self) -> Option<DateTime<Utc>> {
        self.commit.author.as_ref().and_then(|a| a.date)
    }
}

/// Payload of `GET /repos/{owner}/{repo}/commits/{sha}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitDetail {
    pub sha: String,
    #[serde(default)]
    pub files: Vec<FileChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub filename: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub additions: u32,
    #[serde(default)]
    pub deletions: u32,
}

impl FileChange {
    pub fn is_removed(&self) -> bool {
        matches!(self.status.as_str(), "removed" | "deleted")
    }
}
