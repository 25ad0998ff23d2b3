use std::collections::{BTreeSet, HashSet};

use crate::models::{ActivityType, ContributionActivity, ContributionSummary, GitHubEvent};

/// Turns public events into activity records. `owned_repositories` holds
/// the full names of every repository the user owns.
pub fn classify_events(events: &[GitHubEvent], owned_repositories: &[String]) -> Vec<ContributionActivity> {
    let owned: HashSet<String> = owned_repositories.iter().map(|r| r.to_lowercase()).collect();

    events
        .iter()
        .filter_map(|event| {
            let activity_type = ActivityType::from_event_type(&event.event_type)?;
            Some(ContributionActivity {
                activity_type,
                repository: event.repo.name.clone(),
                created_at: event.created_at,
                is_own_repository: owned.contains(&event.repo.name.to_lowercase()),
                action: event
                    .payload
                    .action
                    .clone()
                    .or_else(|| event.payload.ref_type.clone()),
                commit_count: match activity_type {
                    ActivityType::Push => event.payload.size,
                    _ => None,
                },
            })
        })
        .collect()
}

pub fn summarize(activities: &[ContributionActivity]) -> ContributionSummary {
    let mut summary = ContributionSummary::default();
    let mut repositories = BTreeSet::new();

    for activity in activities {
        summary.total_activities += 1;
        if activity.is_own_repository {
            summary.own_repository_activities += 1;
        } else {
            summary.open_source_contributions += 1;
        }
        *summary.by_type.entry(activity.activity_type).or_insert(0) += 1;

        match activity.activity_type {
            ActivityType::Push => {
                summary.pushes += 1;
                summary.pushed_commits += activity.commit_count.unwrap_or(0);
            }
            ActivityType::PullRequest => summary.pull_requests += 1,
            ActivityType::Issue => summary.issues += 1,
            ActivityType::IssueComment | ActivityType::CommitComment => summary.comments += 1,
            ActivityType::PullRequestReview | ActivityType::PullRequestReviewComment => {
                summary.reviews += 1
            }
            ActivityType::Create => summary.creates += 1,
            ActivityType::Fork => summary.forks += 1,
        }

        repositories.insert(activity.repository.clone());
    }

    summary.active_repositories = repositories.into_iter().collect();
    summary
}
