//! Test doubles: in-memory GitHub and model fakes for pipeline tests, and
//! a canned-response HTTP server for the GitHub client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::error::{Error, Result};
use crate::github::GitHubApi;
use crate::llm::LLMProvider;
use crate::models::{
    CommitAuthor, CommitDetail, CommitDetails, CommitSummary, EventPayload, EventRepository,
    FileChange, FileContent, GitHubEvent, Repository, RepositoryOwner, RepositoryTree, TreeEntry,
};

pub fn repository(full_name: &str, size: u64, fork: bool) -> Repository {
    let (owner, name) = full_name.split_once('/').unwrap();
    Repository {
        id: 1,
        name: name.to_string(),
        full_name: full_name.to_string(),
        owner: RepositoryOwner {
            login: owner.to_string(),
        },
        description: Some(format!("{} service", name)),
        topics: Vec::new(),
        language: Some("JavaScript".to_string()),
        size,
        private: false,
        visibility: Some("public".to_string()),
        fork,
        default_branch: Some("main".to_string()),
        html_url: format!("https://github.com/{}", full_name),
        created_at: None,
        updated_at: None,
        pushed_at: None,
    }
}

pub fn commit(sha: &str, author: &str, email: &str) -> CommitSummary {
    CommitSummary {
        sha: sha.to_string(),
        commit: CommitDetails {
            message: "change".to_string(),
            author: Some(CommitAuthor {
                name: author.to_string(),
                email: email.to_string(),
                date: Some(Utc::now()),
            }),
        },
        author: None,
    }
}

pub fn event(event_type: &str, repo: &str) -> GitHubEvent {
    GitHubEvent {
        id: "1".to_string(),
        event_type: event_type.to_string(),
        repo: EventRepository {
            name: repo.to_string(),
        },
        created_at: Utc::now(),
        payload: EventPayload::default(),
    }
}

#[derive(Default)]
pub struct FakeGitHub {
    /// username -> repositories; unknown users are not found.
    pub repositories: HashMap<String, Vec<Repository>>,
    /// full name -> commits, newest first.
    pub commits: HashMap<String, Vec<CommitSummary>>,
    /// sha -> changed paths.
    pub changed_files: HashMap<String, Vec<String>>,
    /// (full name, path) -> file body.
    pub files: HashMap<(String, String), String>,
    /// `None` simulates a failing events endpoint.
    pub events: Option<Vec<GitHubEvent>>,
    /// File fetches that fail with a rate limit before succeeding.
    pub rate_limited_fetches: AtomicU32,
    pub scanned: Mutex<Vec<String>>,
}

impl FakeGitHub {
    pub fn with_repositories(username: &str, repos: Vec<Repository>) -> Self {
        let mut fake = Self {
            events: Some(Vec::new()),
            ..Self::default()
        };
        fake.repositories.insert(username.to_string(), repos);
        fake
    }

    pub fn add_commit(&mut self, full_name: &str, commit: CommitSummary, paths: &[&str]) {
        self.changed_files.insert(
            commit.sha.clone(),
            paths.iter().map(|p| p.to_string()).collect(),
        );
        self.commits
            .entry(full_name.to_string())
            .or_default()
            .push(commit);
    }

    pub fn add_file(&mut self, full_name: &str, path: &str, content: &str) {
        self.files
            .insert((full_name.to_string(), path.to_string()), content.to_string());
    }
}

#[async_trait]
impl GitHubApi for FakeGitHub {
    async fn get_user_repositories(&self, username: &str) -> Result<Vec<Repository>> {
        self.repositories
            .get(username)
            .cloned()
            .ok_or_else(|| Error::UserNotFound(username.to_string()))
    }

    async fn get_repository_commits(
        &self,
        owner: &str,
        repo: &str,
        _since: DateTime<Utc>,
    ) -> Result<Vec<CommitSummary>> {
        let full_name = format!("{}/{}", owner, repo);
        self.scanned.lock().unwrap().push(full_name.clone());
        Ok(self.commits.get(&full_name).cloned().unwrap_or_default())
    }

    async fn get_commit_details(&self, _owner: &str, _repo: &str, sha: &str) -> Result<CommitDetail> {
        let paths = self
            .changed_files
            .get(sha)
            .ok_or_else(|| Error::NotFound(format!("commit {}", sha)))?;
        Ok(CommitDetail {
            sha: sha.to_string(),
            files: paths
                .iter()
                .map(|p| FileChange {
                    filename: p.clone(),
                    status: "modified".to_string(),
                    additions: 1,
                    deletions: 0,
                })
                .collect(),
        })
    }

    async fn get_file_content(&self, owner: &str, repo: &str, path: &str) -> Result<FileContent> {
        let remaining = self.rate_limited_fetches.load(Ordering::SeqCst);
        if remaining > 0 {
            self.rate_limited_fetches.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::RateLimited(1));
        }

        let full_name = format!("{}/{}", owner, repo);
        let body = self
            .files
            .get(&(full_name, path.to_string()))
            .ok_or_else(|| Error::NotFound(format!("file {}", path)))?;
        Ok(FileContent {
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            path: path.to_string(),
            content: STANDARD.encode(body),
            encoding: "base64".to_string(),
            size: body.len() as u64,
        })
    }

    async fn get_repository_tree(&self, owner: &str, repo: &str, sha: &str) -> Result<RepositoryTree> {
        let full_name = format!("{}/{}", owner, repo);
        let tree = self
            .files
            .keys()
            .filter(|(name, _)| *name == full_name)
            .map(|(_, path)| TreeEntry {
                path: path.clone(),
                entry_type: "blob".to_string(),
                size: None,
            })
            .collect();
        Ok(RepositoryTree {
            sha: sha.to_string(),
            tree,
            truncated: false,
        })
    }

    async fn get_repository_languages(&self, _owner: &str, _repo: &str) -> Result<HashMap<String, u64>> {
        Ok(HashMap::from([("JavaScript".to_string(), 1000)]))
    }

    async fn get_user_events(&self, _username: &str, _per_page: u32) -> Result<Vec<GitHubEvent>> {
        self.events.clone().ok_or(Error::GitHubApi {
            status: 503,
            message: "connection reset".to_string(),
        })
    }
}

/// Answers every prompt through a closure.
pub struct FakeLLM<F>(pub F);

#[async_trait]
impl<F> LLMProvider for FakeLLM<F>
where
    F: Fn(&str) -> Result<String> + Send + Sync,
{
    async fn complete(&self, _model: &str, prompt: &str) -> Result<String> {
        (self.0)(prompt)
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub struct StubResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl StubResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// Serves one response per connection, chosen by request path (with query).
/// Returns the base URL and the paths requested so far.
pub async fn stub_server<F>(handler: F) -> (String, Arc<Mutex<Vec<String>>>)
where
    F: Fn(&str) -> StubResponse + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let seen = requests.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request: Vec<u8> = Vec::new();
            let mut chunk = [0u8; 4096];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&chunk[..n]),
                }
            }

            let request = String::from_utf8_lossy(&request);
            let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
            seen.lock().unwrap().push(path.clone());

            let response = handler(&path);
            let mut head = format!(
                "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
                response.status,
                response.body.len()
            );
            for (name, value) in &response.headers {
                head.push_str(&format!("{}: {}\r\n", name, value));
            }
            head.push_str("\r\n");

            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.write_all(response.body.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}", addr), requests)
}
