use std::collections::HashSet;

use crate::models::CommitSummary;

/// Decides which commits count as the target user's work.
pub struct CommitAttribution {
    username: String,
    real_name: Option<String>,
}

impl CommitAttribution {
    pub fn new(username: &str, real_name: Option<&str>) -> Self {
        Self {
            username: username.to_lowercase(),
            real_name: real_name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        }
    }

    pub fn is_attributed(&self, commit: &CommitSummary) -> bool {
        if commit
            .author_login()
            .map(|login| login.eq_ignore_ascii_case(&self.username))
            .unwrap_or(false)
        {
            return true;
        }

        if !self.username.is_empty() && commit.author_email().to_lowercase().contains(&self.username) {
            return true;
        }

        let author = commit.author_name();
        is_name_similar(author, &self.username)
            || self
                .real_name
                .as_deref()
                .map(|real| is_name_similar(author, real))
                .unwrap_or(false)
    }

    /// Commits attributed to the user. For forks with none, the most recent
    /// `fallback` commits are taken regardless of author when
    /// `fork_fallback` is set; the flag in the result reports that case.
    pub fn select(
        &self,
        mut commits: Vec<CommitSummary>,
        is_fork: bool,
        fork_fallback: bool,
        fallback: usize,
    ) -> (Vec<CommitSummary>, bool) {
        let attributed: Vec<CommitSummary> = commits
            .iter()
            .filter(|c| self.is_attributed(c))
            .cloned()
            .collect();

        if attributed.is_empty() && is_fork && fork_fallback {
            commits.sort_by(|a, b| b.authored_at().cmp(&a.authored_at()));
            commits.truncate(fallback);
            let used = !commits.is_empty();
            return (commits, used);
        }

        (attributed, false)
    }
}

/// Lowercase letters only.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect()
}

fn name_words(name: &str) -> HashSet<String> {
    name.split(|c: char| !c.is_alphabetic())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .collect()
}

/// Equal after normalization, one contains the other, or the two share a
/// word of at least three letters.
pub fn is_name_similar(a: &str, b: &str) -> bool {
    let left = normalize_name(a);
    let right = normalize_name(b);
    if left.is_empty() || right.is_empty() {
        return false;
    }

    if left == right || left.contains(&right) || right.contains(&left) {
        return true;
    }

    let left_words = name_words(a);
    name_words(b).iter().any(|w| left_words.contains(w))
}
