use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::github::api::GitHubApi;
use crate::github::auth::{AppCredentials, InstallationToken};
use crate::github::paginator::Paginator;
use crate::github::rate_limiter::RateLimiter;
use crate::models::{
    ActivityType, CommitDetail, CommitSummary, FileContent, GitHubEvent, RateLimitResponse,
    RateLimitStatus, Repository, RepositoryTree,
};
use crate::retry::{retry, Backoff, RetryAction};

pub const GITHUB_API_URL: &str = "https://api.github.com";

const PAGE_SIZE: u32 = 100;
const MAX_COMMITS_PER_REPO: usize = 300;
/// Three requests with waits of 1s and 2s between them. No wait follows
/// the last failure, so the 3s step of the linear schedule is never used.
const EVENT_ATTEMPTS: u32 = 3;

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// Authenticated GitHub client for one App installation.
pub struct GitHubClient {
    client: Client,
    rate_limiter: RateLimiter,
    base_url: String,
    event_backoff: Backoff,
}

impl GitHubClient {
    /// Exchanges the app credentials for an installation token and returns
    /// a client authenticated with it.
    pub async fn connect(credentials: &AppCredentials) -> Result<Self> {
        Self::connect_to(GITHUB_API_URL, credentials).await
    }

    pub async fn connect_to(base_url: &str, credentials: &AppCredentials) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/');
        let jwt = credentials.app_jwt()?;
        let bootstrap = Client::builder().default_headers(default_headers()).build()?;

        let url = format!(
            "{}/app/installations/{}/access_tokens",
            base_url,
            credentials.installation_id()
        );
        tracing::info!(
            "Authenticating as GitHub App {} (installation {})",
            credentials.app_id(),
            credentials.installation_id()
        );

        let response = bootstrap.post(&url).bearer_auth(&jwt).send().await?;
        let status = response.status();

        if matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        ) {
            let message = error_message(response).await;
            return Err(Error::Config(format!(
                "GitHub App authentication failed ({}): {}",
                status.as_u16(),
                message
            )));
        }
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(Error::GitHubApi {
                status: status.as_u16(),
                message,
            });
        }

        let token: InstallationToken = response.json().await?;
        tracing::debug!("Installation token valid until {}", token.expires_at);

        Self::with_token(&token.token, base_url)
    }

    pub fn with_token(token: &str, base_url: &str) -> Result<Self> {
        let mut headers = default_headers();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", token))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            event_backoff: Backoff::Linear(Duration::from_secs(1)),
        })
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub async fn get_rate_limit(&self) -> Result<RateLimitStatus> {
        let url = format!("{}/rate_limit", self.base_url);
        let response: RateLimitResponse = self.get_json(&url, "rate limit status").await?;
        Ok(response.resources.core)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str, resource: &str) -> Result<T> {
        let response = self.send(url, resource).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send(&self, url: &str, resource: &str) -> Result<Response> {
        self.rate_limiter.wait().await;
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        self.rate_limiter.update_from_headers(response.headers());

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let message = error_message(response).await;
        Err(classify_failure(
            status,
            &headers,
            &message,
            resource,
            self.rate_limiter.seconds_until_reset(),
        ))
    }

    async fn fetch_events(&self, username: &str, per_page: u32) -> Result<Vec<GitHubEvent>> {
        let url = format!(
            "{}/users/{}/events/public?per_page={}",
            self.base_url, username, per_page
        );
        self.get_json(&url, &format!("events for {}", username)).await
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn get_user_repositories(&self, username: &str) -> Result<Vec<Repository>> {
        let url = format!(
            "{}/users/{}/repos?type=owner&sort=updated",
            self.base_url, username
        );
        tracing::info!("Fetching repositories for: {}", username);

        let repos: Vec<Repository> = Paginator::new(self)
            .fetch_all(&url, PAGE_SIZE, &format!("user {}", username))
            .await
            .map_err(|e| match e {
                Error::NotFound(_) => Error::UserNotFound(username.to_string()),
                other => other,
            })?;

        Ok(repos.into_iter().filter(|r| r.is_public()).collect())
    }

    async fn get_repository_commits(
        &self,
        owner: &str,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<CommitSummary>> {
        let url = format!(
            "{}/repos/{}/{}/commits?since={}",
            self.base_url,
            owner,
            repo,
            since.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        tracing::debug!("Fetching commits for: {}/{}", owner, repo);

        Paginator::new(self)
            .fetch_limited(
                &url,
                PAGE_SIZE,
                MAX_COMMITS_PER_REPO,
                &format!("commits of {}/{}", owner, repo),
            )
            .await
    }

    async fn get_commit_details(&self, owner: &str, repo: &str, sha: &str) -> Result<CommitDetail> {
        let url = format!("{}/repos/{}/{}/commits/{}", self.base_url, owner, repo, sha);
        tracing::debug!("Fetching commit: {}", &sha[..7.min(sha.len())]);
        self.get_json(&url, &format!("commit {} in {}/{}", sha, owner, repo))
            .await
    }

    async fn get_file_content(&self, owner: &str, repo: &str, path: &str) -> Result<FileContent> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.base_url,
            owner,
            repo,
            encode_path(path)
        );
        self.get_json(&url, &format!("file {} in {}/{}", path, owner, repo))
            .await
    }

    async fn get_repository_tree(&self, owner: &str, repo: &str, sha: &str) -> Result<RepositoryTree> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.base_url, owner, repo, sha
        );
        self.get_json(&url, &format!("tree {} of {}/{}", sha, owner, repo))
            .await
    }

    async fn get_repository_languages(&self, owner: &str, repo: &str) -> Result<HashMap<String, u64>> {
        let url = format!("{}/repos/{}/{}/languages", self.base_url, owner, repo);
        self.get_json(&url, &format!("languages of {}/{}", owner, repo))
            .await
    }

    /// Activity data is supplementary, so a fetch that keeps failing
    /// produces an empty list instead of an error.
    async fn get_user_events(&self, username: &str, per_page: u32) -> Result<Vec<GitHubEvent>> {
        let backoff = self.event_backoff;
        let result = retry(
            EVENT_ATTEMPTS,
            |err: &Error| {
                if err.is_retryable() {
                    RetryAction::Retry(backoff)
                } else {
                    RetryAction::Abort
                }
            },
            |_| self.fetch_events(username, per_page),
        )
        .await;

        match result {
            Ok(events) => Ok(events
                .into_iter()
                .filter(|e| ActivityType::from_event_type(&e.event_type).is_some())
                .collect()),
            Err(e) => {
                tracing::warn!("Could not fetch public events for {}: {}", username, e);
                Ok(Vec::new())
            }
        }
    }
}

fn default_headers() -> header::HeaderMap {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        header::HeaderValue::from_static("application/vnd.github+json"),
    );
    headers.insert(
        "X-GitHub-Api-Version",
        header::HeaderValue::from_static("2022-11-28"),
    );
    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_static("techprofile/0.1"),
    );
    headers
}

/// Maps a non-success response to an error. `reset_wait` is used for rate
/// limits that carry no `Retry-After` header.
fn classify_failure(
    status: StatusCode,
    headers: &header::HeaderMap,
    message: &str,
    resource: &str,
    reset_wait: u64,
) -> Error {
    if status == StatusCode::NOT_FOUND {
        return Error::NotFound(resource.to_string());
    }

    let exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim() == "0")
        .unwrap_or(false);

    // Secondary rate limits come back as 403 with only a message to go on.
    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN
            && (exhausted || message.to_lowercase().contains("rate limit")))
    {
        let wait = headers
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(reset_wait);
        return Error::RateLimited(wait);
    }

    Error::GitHubApi {
        status: status.as_u16(),
        message: format!("{}: {}", resource, message),
    }
}

async fn error_message(response: Response) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or(body)
}

/// Percent-encodes the characters of a repository path that would break
/// the request URL. Slashes stay as separators.
fn encode_path(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len());
    for byte in path.trim_start_matches('/').bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{:02X}", other)),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{stub_server, StubResponse};
    use serde_json::json;

    fn headers(pairs: &[(&'static str, &'static str)]) -> header::HeaderMap {
        let mut map = header::HeaderMap::new();
        for &(name, value) in pairs {
            map.insert(name, header::HeaderValue::from_static(value));
        }
        map
    }

    fn repo_json(id: u64, name: &str, private: bool) -> serde_json::Value {
        json!({
            "id": id,
            "name": name,
            "full_name": format!("octodev/{}", name),
            "owner": {"login": "octodev"},
            "description": null,
            "language": "Rust",
            "size": 120,
            "private": private,
            "visibility": if private { "private" } else { "public" },
            "fork": false,
            "default_branch": "main",
            "html_url": format!("https://github.com/octodev/{}", name)
        })
    }

    #[test]
    fn test_classify_not_found() {
        let err = classify_failure(StatusCode::NOT_FOUND, &headers(&[]), "Not Found", "file a.rs", 60);
        assert!(matches!(err, Error::NotFound(ref r) if r == "file a.rs"));
    }

    #[test]
    fn test_classify_too_many_requests_uses_retry_after() {
        let err = classify_failure(
            StatusCode::TOO_MANY_REQUESTS,
            &headers(&[("retry-after", "7")]),
            "slow down",
            "commits",
            60,
        );
        assert!(matches!(err, Error::RateLimited(7)));

        let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, &headers(&[]), "", "commits", 42);
        assert!(matches!(err, Error::RateLimited(42)));
    }

    #[test]
    fn test_classify_forbidden_with_exhausted_budget() {
        let err = classify_failure(
            StatusCode::FORBIDDEN,
            &headers(&[("x-ratelimit-remaining", "0")]),
            "Forbidden",
            "commits",
            30,
        );
        assert!(matches!(err, Error::RateLimited(30)));
    }

    #[test]
    fn test_classify_forbidden_secondary_rate_limit_message() {
        let err = classify_failure(
            StatusCode::FORBIDDEN,
            &headers(&[("x-ratelimit-remaining", "4000")]),
            "You have exceeded a secondary Rate Limit.",
            "commits",
            30,
        );
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_classify_plain_forbidden_and_server_errors() {
        let err = classify_failure(
            StatusCode::FORBIDDEN,
            &headers(&[("x-ratelimit-remaining", "4000")]),
            "Resource not accessible by integration",
            "tree",
            30,
        );
        assert!(matches!(err, Error::GitHubApi { status: 403, .. }));
        assert!(!err.is_retryable());

        let err = classify_failure(StatusCode::BAD_GATEWAY, &headers(&[]), "", "tree", 30);
        assert!(matches!(err, Error::GitHubApi { status: 502, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_repository_listing_pages_and_drops_private() {
        let (base_url, requests) = stub_server(|path| {
            if path.ends_with("&page=1") {
                let page: Vec<_> = (0..100)
                    .map(|i| repo_json(i, &format!("repo-{}", i), i % 10 == 0))
                    .collect();
                StubResponse::json(200, json!(page).to_string())
            } else if path.ends_with("&page=2") {
                StubResponse::json(200, json!([repo_json(100, "last", false)]).to_string())
            } else {
                StubResponse::json(500, r#"{"message": "unexpected page"}"#)
            }
        })
        .await;
        let client = GitHubClient::with_token("token", &base_url).unwrap();

        let repos = client.get_user_repositories("octodev").await.unwrap();
        assert_eq!(repos.len(), 91);
        assert!(repos.iter().all(|r| !r.private));
        assert_eq!(repos.last().unwrap().name, "last");

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("/users/octodev/repos?"));
    }

    #[tokio::test]
    async fn test_unknown_user_listing_is_user_not_found() {
        let (base_url, _) =
            stub_server(|_| StubResponse::json(404, r#"{"message": "Not Found"}"#)).await;
        let client = GitHubClient::with_token("token", &base_url).unwrap();

        let err = client.get_user_repositories("ghost").await.unwrap_err();
        assert!(matches!(err, Error::UserNotFound(ref u) if u == "ghost"));
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let (base_url, requests) =
            stub_server(|_| StubResponse::json(404, r#"{"message": "Not Found"}"#)).await;
        let client = GitHubClient::with_token("token", &base_url).unwrap();

        let err = client
            .get_file_content("octodev", "site", "docs/my page.md")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
        assert_eq!(
            requests.lock().unwrap()[0],
            "/repos/octodev/site/contents/docs/my%20page.md"
        );
    }

    #[tokio::test]
    async fn test_rate_limited_response_over_http() {
        let (base_url, _) = stub_server(|_| {
            StubResponse::json(403, r#"{"message": "API rate limit exceeded"}"#)
                .with_header("retry-after", "9")
        })
        .await;
        let client = GitHubClient::with_token("token", &base_url).unwrap();

        let err = client
            .get_commit_details("octodev", "site", "abc1234")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RateLimited(9)));
        assert!(err.to_string().contains("rate limit"));
    }

    #[tokio::test]
    async fn test_events_keep_contribution_types_only() {
        let (base_url, _) = stub_server(|_| {
            let event = |id: &str, kind: &str| {
                json!({
                    "id": id,
                    "type": kind,
                    "repo": {"name": "serde-rs/serde"},
                    "created_at": "2024-05-01T12:00:00Z",
                    "payload": {}
                })
            };
            let events = json!([
                event("1", "PushEvent"),
                event("2", "WatchEvent"),
                event("3", "PullRequestReviewEvent"),
                event("4", "PublicEvent")
            ]);
            StubResponse::json(200, events.to_string())
        })
        .await;
        let client = GitHubClient::with_token("token", &base_url).unwrap();

        let events = client.get_user_events("octodev", 100).await.unwrap();
        let kinds: Vec<_> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(kinds, vec!["PushEvent", "PullRequestReviewEvent"]);
    }

    #[tokio::test]
    async fn test_failing_events_yield_empty_list() {
        let (base_url, requests) =
            stub_server(|_| StubResponse::json(503, r#"{"message": "unavailable"}"#)).await;
        let mut client = GitHubClient::with_token("token", &base_url).unwrap();
        client.event_backoff = Backoff::None;

        let events = client.get_user_events("octodev", 100).await.unwrap();
        assert!(events.is_empty());
        assert_eq!(requests.lock().unwrap().len(), EVENT_ATTEMPTS as usize);
    }

    #[test]
    fn test_encode_path() {
        assert_eq!(encode_path("src/main.rs"), "src/main.rs");
        assert_eq!(encode_path("/docs/my file#1.md"), "docs/my%20file%231.md");
    }

    #[test]
    fn test_with_token_trims_base_url() {
        let client = GitHubClient::with_token("token", "http://localhost:9999/").unwrap();
        assert_eq!(client.base_url, "http://localhost:9999");
    }
}
