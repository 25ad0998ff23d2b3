use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: RepositoryOwner,
    pub description: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub language: Option<String>,
    /// Kilobytes, as reported by GitHub.
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub private: bool,
    pub visibility: Option<String>,
    #[serde(default)]
    pub fork: bool,
    pub default_branch: Option<String>,
    #[serde(default)]
    pub html_url: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub pushed_at: Option<DateTime<Utc>>,
}

impl Repository {
    pub fn is_public(&self) -> bool {
        !self.private
            && self
                .visibility
                .as_deref()
                .map(|v| v.eq_ignore_ascii_case("public"))
                .unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

/// Payload of `GET /repos/{owner}/{repo}/contents/{path}` for a file.
#[derive(Debug, Clone, Deserialize)]
pub struct FileContent {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: String,
    #[serde(default)]
    pub size: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryTree {
    pub sha: String,
    #[serde(default)]
    pub tree: Vec<TreeEntry>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub size: Option<u64>,
}

impl TreeEntry {
    pub fn is_file(&self) -> bool {
        self.entry_type == "blob"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResponse {
    pub resources: RateLimitResources,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitResources {
    pub core: RateLimitStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    /// Unix timestamp of the next reset.
    pub reset: i64,
    #[serde(default)]
    pub used: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_from_api_payload() {
        let payload = r#"{
            "id": 1,
            "name": "api",
            "full_name": "octo/api",
            "owner": {"login": "octo"},
            "description": null,
            "language": "TypeScript",
            "size": 1200,
            "private": false,
            "visibility": "public",
            "fork": false,
            "default_branch": "main",
            "html_url": "https://github.com/octo/api",
            "created_at": "2023-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z",
            "pushed_at": "2024-01-02T00:00:00Z"
        }"#;

        let repo: Repository = serde_json::from_str(payload).unwrap();
        assert_eq!(repo.full_name, "octo/api");
        assert!(repo.topics.is_empty());
        assert!(repo.is_public());
    }

    #[test]
    fn test_private_visibility_is_not_public() {
        let payload = r#"{"id": 2, "name": "x", "full_name": "o/x", "owner": {"login": "o"},
            "description": null, "language": null, "visibility": "private"}"#;
        let repo: Repository = serde_json::from_str(payload).unwrap();
        assert!(!repo.is_public());
    }
}
