use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::sleep;

use crate::analysis::activity::{classify_events, summarize};
use crate::analysis::attribution::CommitAttribution;
use crate::analysis::evidence::{key_files_from_tree, rank_changed_files};
use crate::analysis::scoring::{aggregate_profiles, apply_weight, merge_weighted, sort_detections};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::github::{decode_file_content, GitHubApi};
use crate::llm::TechnologyExtractor;
use crate::models::{
    AnalyzedRepository, CodeFile, CommitSummary, ContributionActivity, ContributionSummary,
    DetectionSource, GitHubProfileAnalysis, Repository, RepositorySummary, TechnologyCategory,
    TechnologyProfile,
};
use crate::retry::{retry, Backoff, RetryAction};

/// A repository that survived the activity scan.
struct RepositoryCandidate {
    repo: Repository,
    commits: Vec<CommitSummary>,
    changed_files: Vec<String>,
}

/// Drives the whole analysis: activity scan, evidence collection, LLM
/// extraction, weighting and aggregation. Work is strictly sequential to
/// stay inside GitHub and model rate limits.
pub struct ProfileAnalyzer {
    github: Arc<dyn GitHubApi>,
    extractor: TechnologyExtractor,
    config: PipelineConfig,
}

impl ProfileAnalyzer {
    pub fn new(
        github: impl GitHubApi + 'static,
        extractor: TechnologyExtractor,
        config: PipelineConfig,
    ) -> Self {
        Self {
            github: Arc::new(github),
            extractor,
            config,
        }
    }

    /// Fails only when the repository listing fails (unknown user, GitHub
    /// errors). Problems with single repositories, files or the activity
    /// feed degrade the result instead.
    pub async fn analyze_profile(
        &self,
        username: &str,
        real_name: Option<&str>,
    ) -> Result<GitHubProfileAnalysis> {
        let username = username.trim();
        if username.is_empty() {
            return Err(Error::UserNotFound("(empty username)".to_string()));
        }

        // Step 1: Fetch repositories
        tracing::info!("Analyzing GitHub profile: {}", username);
        let repos = self.github.get_user_repositories(username).await?;
        tracing::info!("Found {} public repositories", repos.len());

        // Step 2-3: Commit activity scan
        let mut candidates = self.scan_commit_activity(username, real_name, &repos).await;

        // Step 4: Keep the most active repositories
        candidates.sort_by(|a, b| b.commits.len().cmp(&a.commits.len()));
        candidates.truncate(self.config.max_analyzed_repositories);
        tracing::info!("Selected {} repositories for deep analysis", candidates.len());

        // Step 5: Per-repository extraction
        let analyzed = self.analyze_candidates(&candidates).await?;

        // Step 6: User-level aggregation
        let technologies = aggregate_profiles(&analyzed, self.config.inclusion_threshold);
        tracing::info!(
            "Aggregated {} technologies from {} repositories",
            technologies.len(),
            analyzed.len()
        );

        // Step 7: Contribution activity
        let owned: Vec<String> = repos.iter().map(|r| r.full_name.clone()).collect();
        let (contribution_activity, contribution_summary) =
            self.collect_activity(username, &owned).await;

        Ok(GitHubProfileAnalysis {
            username: username.to_string(),
            real_name: real_name.map(str::to_string),
            repository_count: repos.len(),
            repositories: analyzed,
            technologies,
            contribution_activity,
            contribution_summary,
            analyzed_at: Utc::now(),
        })
    }

    async fn scan_commit_activity(
        &self,
        username: &str,
        real_name: Option<&str>,
        repos: &[Repository],
    ) -> Vec<RepositoryCandidate> {
        let attribution = CommitAttribution::new(username, real_name);
        let since = Utc::now() - Duration::days(self.config.commit_lookback_days);
        let mut candidates = Vec::new();

        let scanned = repos
            .iter()
            .filter(|r| r.size >= self.config.min_repository_size_kb)
            .take(self.config.max_scanned_repositories);

        for repo in scanned {
            let commits = match self
                .github
                .get_repository_commits(&repo.owner.login, &repo.name, since)
                .await
            {
                Ok(commits) => commits,
                Err(e) => {
                    tracing::warn!("Skipping {}: could not list commits: {}", repo.full_name, e);
                    continue;
                }
            };

            let (commits, used_fallback) = attribution.select(
                commits,
                repo.fork,
                self.config.fork_fallback,
                self.config.fork_fallback_commits,
            );
            if commits.is_empty() {
                tracing::debug!("No recent attributable commits in {}", repo.full_name);
                continue;
            }
            if used_fallback {
                tracing::info!(
                    "Fork {} has no attributable commits, inspecting {} recent commits",
                    repo.full_name,
                    commits.len()
                );
            }

            let changed_files = self.collect_changed_files(repo, &commits).await;
            tracing::debug!(
                "{}: {} commits, {} changed files",
                repo.full_name,
                commits.len(),
                changed_files.len()
            );

            candidates.push(RepositoryCandidate {
                repo: repo.clone(),
                commits,
                changed_files,
            });
        }

        candidates
    }

    async fn collect_changed_files(&self, repo: &Repository, commits: &[CommitSummary]) -> Vec<String> {
        let step = self.config.retry.commit_detail_step;
        let mut seen = HashSet::new();
        let mut paths = Vec::new();

        for commit in commits.iter().take(self.config.commit_details_per_repo) {
            let detail = retry(
                self.config.retry.commit_detail_attempts,
                |e: &Error| {
                    if e.is_retryable() {
                        RetryAction::Retry(Backoff::Linear(step))
                    } else {
                        RetryAction::Abort
                    }
                },
                |_| {
                    self.github
                        .get_commit_details(&repo.owner.login, &repo.name, &commit.sha)
                },
            )
            .await;

            match detail {
                Ok(detail) => {
                    for file in detail.files {
                        if !file.is_removed() && seen.insert(file.filename.clone()) {
                            paths.push(file.filename);
                        }
                    }
                }
                Err(e) => tracing::warn!(
                    "Skipping commit {} in {}: {}",
                    &commit.sha[..7.min(commit.sha.len())],
                    repo.full_name,
                    e
                ),
            }
        }

        paths
    }

    /// Repositories that keep failing are skipped. Unrecoverable errors
    /// (rejected model credentials, bad configuration) end the run, since
    /// every other repository would fail the same way.
    async fn analyze_candidates(&self, candidates: &[RepositoryCandidate]) -> Result<Vec<AnalyzedRepository>> {
        let timings = &self.config.retry;
        let pb = ProgressBar::new(candidates.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} repos")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let mut analyzed = Vec::new();

        for candidate in candidates {
            let result = retry(
                timings.repository_attempts,
                |e: &Error| {
                    if e.is_unrecoverable() {
                        RetryAction::Abort
                    } else if e.is_rate_limited() {
                        RetryAction::Retry(Backoff::Exponential {
                            base: timings.rate_limit_base,
                            cap: timings.rate_limit_cap,
                        })
                    } else {
                        RetryAction::Retry(Backoff::Fixed(timings.repository_flat_wait))
                    }
                },
                |attempt| {
                    if attempt > 0 {
                        tracing::info!(
                            "Retrying {} (attempt {}/{})",
                            candidate.repo.full_name,
                            attempt + 1,
                            timings.repository_attempts
                        );
                    }
                    self.analyze_repository(candidate)
                },
            )
            .await;

            match result {
                Ok(repo) => {
                    analyzed.push(repo);
                    if !timings.repository_pause.is_zero() {
                        sleep(timings.repository_pause).await;
                    }
                }
                Err(e) if e.is_unrecoverable() => {
                    pb.finish_and_clear();
                    tracing::error!("Aborting analysis at {}: {}", candidate.repo.full_name, e);
                    return Err(e);
                }
                Err(e) => tracing::warn!(
                    "Skipping {} after {} attempts: {}",
                    candidate.repo.full_name,
                    timings.repository_attempts,
                    e
                ),
            }
            pb.inc(1);
        }

        pb.finish_and_clear();
        Ok(analyzed)
    }

    async fn analyze_repository(&self, candidate: &RepositoryCandidate) -> Result<AnalyzedRepository> {
        let repo = &candidate.repo;
        let weights = self.config.weights;

        let files = self.fetch_evidence_files(repo, &candidate.changed_files).await?;
        let summary = self.build_summary(repo).await;

        let file_profile = if files.is_empty() {
            TechnologyProfile::default()
        } else {
            self.extractor.analyze_repository(&files).await?
        };
        let summary_profile = self.extractor.analyze_repository_summary(&summary).await?;

        // Knowing which files the user touched makes metadata evidence more
        // trustworthy even when their contents could not be analyzed.
        let (summary_weight, summary_source) = if files.is_empty() && !candidate.changed_files.is_empty() {
            (weights.commit, DetectionSource::Commit)
        } else {
            (weights.metadata, DetectionSource::Metadata)
        };

        let mut technologies = merge_weighted(
            apply_weight(file_profile, weights.file, DetectionSource::File, &repo.full_name),
            apply_weight(summary_profile, summary_weight, summary_source, &repo.full_name),
        );
        for category in TechnologyCategory::ALL {
            sort_detections(technologies.category_mut(category));
        }

        tracing::info!(
            "{}: {} technologies from {} files",
            repo.full_name,
            technologies.len(),
            files.len()
        );

        Ok(AnalyzedRepository {
            name: repo.name.clone(),
            full_name: repo.full_name.clone(),
            description: repo.description.clone(),
            url: repo.html_url.clone(),
            size: repo.size,
            attributed_commits: candidate.commits.len(),
            files_analyzed: files.len(),
            technologies,
        })
    }

    async fn fetch_evidence_files(&self, repo: &Repository, changed_files: &[String]) -> Result<Vec<CodeFile>> {
        let mut files = Vec::new();

        for path in rank_changed_files(changed_files) {
            if files.len() >= self.config.max_files_per_repo {
                break;
            }

            let content = match self
                .github
                .get_file_content(&repo.owner.login, &repo.name, &path)
                .await
            {
                Ok(content) => content,
                Err(Error::NotFound(_)) => {
                    tracing::debug!("{} no longer exists in {}", path, repo.full_name);
                    continue;
                }
                Err(e) => return Err(e),
            };

            if content.size > self.config.max_file_size_bytes {
                tracing::debug!("Skipping {} ({} bytes)", path, content.size);
                continue;
            }

            match decode_file_content(&content.content, &content.encoding) {
                Ok(text) if !text.trim().is_empty() => files.push(CodeFile {
                    name: content.name,
                    path: content.path,
                    content: text,
                    size: content.size,
                }),
                Ok(_) => {}
                Err(e) => tracing::warn!("Could not decode {} in {}: {}", path, repo.full_name, e),
            }
        }

        Ok(files)
    }

    /// Languages and key file names are optional context; failures leave
    /// them empty.
    async fn build_summary(&self, repo: &Repository) -> RepositorySummary {
        let owner = &repo.owner.login;

        let languages = match self.github.get_repository_languages(owner, &repo.name).await {
            Ok(languages) => {
                let mut languages: Vec<(String, u64)> = languages.into_iter().collect();
                languages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                languages.into_iter().map(|(name, _)| name).collect()
            }
            Err(e) => {
                tracing::debug!("No language breakdown for {}: {}", repo.full_name, e);
                repo.language.iter().cloned().collect()
            }
        };

        let branch = repo.default_branch.as_deref().unwrap_or("HEAD");
        let key_files = match self.github.get_repository_tree(owner, &repo.name, branch).await {
            Ok(tree) => key_files_from_tree(&tree),
            Err(e) => {
                tracing::debug!("No file tree for {}: {}", repo.full_name, e);
                Vec::new()
            }
        };

        RepositorySummary {
            name: repo.full_name.clone(),
            description: repo.description.clone(),
            topics: repo.topics.clone(),
            languages,
            key_files,
        }
    }

    async fn collect_activity(
        &self,
        username: &str,
        owned: &[String],
    ) -> (Vec<ContributionActivity>, ContributionSummary) {
        match self
            .github
            .get_user_events(username, self.config.events_per_page)
            .await
        {
            Ok(events) => {
                let activities = classify_events(&events, owned);
                let summary = summarize(&activities);
                (activities, summary)
            }
            Err(e) => {
                tracing::warn!("Contribution activity unavailable for {}: {}", username, e);
                (Vec::new(), ContributionSummary::failed(e.to_string()))
            }
        }
    }
}
