use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Item of `GET /users/{username}/events/public`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub repo: EventRepository,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub payload: EventPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRepository {
    /// `owner/name`
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventPayload {
    pub action: Option<String>,
    /// Number of commits in a push.
    pub size: Option<u32>,
    pub ref_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Push,
    PullRequest,
    Issue,
    IssueComment,
    PullRequestReview,
    PullRequestReviewComment,
    Create,
    Fork,
    CommitComment,
}

impl ActivityType {
    /// Maps a GitHub event type to an activity, `None` for event types that
    /// say nothing about contributions (watch, member, public, ...).
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type {
            "PushEvent" => Some(ActivityType::Push),
            "PullRequestEvent" => Some(ActivityType::PullRequest),
            "IssuesEvent" => Some(ActivityType::Issue),
            "IssueCommentEvent" => Some(ActivityType::IssueComment),
            "PullRequestReviewEvent" => Some(ActivityType::PullRequestReview),
            "PullRequestReviewCommentEvent" => Some(ActivityType::PullRequestReviewComment),
            "CreateEvent" => Some(ActivityType::Create),
            "ForkEvent" => Some(ActivityType::Fork),
            "CommitCommentEvent" => Some(ActivityType::CommitComment),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityType::Push => write!(f, "Push"),
            ActivityType::PullRequest => write!(f, "Pull Request"),
            ActivityType::Issue => write!(f, "Issue"),
            ActivityType::IssueComment => write!(f, "Issue Comment"),
            ActivityType::PullRequestReview => write!(f, "Review"),
            ActivityType::PullRequestReviewComment => write!(f, "Review Comment"),
            ActivityType::Create => write!(f, "Create"),
            ActivityType::Fork => write!(f, "Fork"),
            ActivityType::CommitComment => write!(f, "Commit Comment"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionActivity {
    pub activity_type: ActivityType,
    pub repository: String,
    pub created_at: DateTime<Utc>,
    pub is_own_repository: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_count: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContributionSummary {
    pub total_activities: u32,
    pub open_source_contributions: u32,
    pub own_repository_activities: u32,
    pub pushes: u32,
    pub pull_requests: u32,
    pub issues: u32,
    pub comments: u32,
    pub reviews: u32,
    pub creates: u32,
    pub forks: u32,
    pub pushed_commits: u32,
    pub by_type: BTreeMap<ActivityType, u32>,
    pub active_repositories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ContributionSummary {
    /// Zeroed summary recording why activity could not be collected.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}
