use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::llm::parser::parse_technology_response;
use crate::llm::prompts::{file_prompt, summary_prompt, truncate_chars, MAX_FILE_CHARS};
use crate::llm::provider::LLMProvider;
use crate::models::{CodeFile, DetectionSource, RepositorySummary, TechnologyCategory, TechnologyProfile};
use crate::retry::{retry, Backoff, RetryAction};

/// Files analyzed per repository by [`TechnologyExtractor::analyze_repository`].
pub const MAX_FILES_PER_ANALYSIS: usize = 10;

/// Path substrings in priority order: manifests, container setup,
/// entrypoints, then framework configuration.
pub const FILE_PRIORITY_PATTERNS: &[&str] = &[
    "package.json",
    "requirements.txt",
    "go.mod",
    "cargo.toml",
    "pom.xml",
    "dockerfile",
    "docker-compose.yml",
    "main.py",
    "app.py",
    "index.js",
    "index.ts",
    "main.go",
    "main.rs",
    "server.js",
    "app.js",
    "next.config",
    "vite.config",
    "webpack.config",
    "angular.json",
    "settings.py",
    "build.gradle",
    "tsconfig.json",
];

/// Turns code and repository metadata into technology profiles, falling
/// back across the configured models.
pub struct TechnologyExtractor {
    llm: Arc<dyn LLMProvider>,
    models: Vec<String>,
    preferred_model: AtomicUsize,
}

impl TechnologyExtractor {
    pub fn new(llm: impl LLMProvider + 'static, models: Vec<String>) -> Result<Self> {
        if models.is_empty() {
            return Err(Error::Config("at least one model id is required".to_string()));
        }
        Ok(Self {
            llm: Arc::new(llm),
            models,
            preferred_model: AtomicUsize::new(0),
        })
    }

    /// Model the next request starts with: the last one that succeeded.
    pub fn current_model(&self) -> &str {
        &self.models[self.preferred_model.load(Ordering::Relaxed) % self.models.len()]
    }

    pub async fn analyze_code_file(&self, content: &str, filename: &str) -> Result<TechnologyProfile> {
        let response = self.generate(&file_prompt(content, filename)).await?;
        Ok(parse_or_empty(&response, DetectionSource::File, filename))
    }

    /// Cheaper pass over metadata only; detections are verified against the
    /// metadata itself.
    pub async fn analyze_repository_summary(&self, summary: &RepositorySummary) -> Result<TechnologyProfile> {
        let response = self.generate(&summary_prompt(summary)).await?;
        let profile = parse_or_empty(&response, DetectionSource::Metadata, &summary.name);
        let corpus = build_evidence_corpus(std::iter::empty(), Some(summary));
        Ok(verify_against_evidence(profile, &corpus))
    }

    pub async fn analyze_repository(&self, files: &[CodeFile]) -> Result<TechnologyProfile> {
        let selected: Vec<&CodeFile> = prioritize_files(files)
            .into_iter()
            .take(MAX_FILES_PER_ANALYSIS)
            .collect();

        let mut merged = TechnologyProfile::default();
        for file in &selected {
            tracing::debug!("Extracting technologies from {}", file.path);
            let profile = self.analyze_code_file(&file.content, &file.path).await?;
            merged.merge_max(profile);
        }

        let corpus = build_evidence_corpus(selected.iter().copied(), None);
        Ok(verify_against_evidence(merged, &corpus))
    }

    /// Tries each model once, starting from the last one that worked.
    async fn generate(&self, prompt: &str) -> Result<String> {
        let start = self.preferred_model.load(Ordering::Relaxed);
        let count = self.models.len();
        let llm = &self.llm;
        let models = &self.models;

        let (index, text) = retry(count as u32, classify_model_error, |attempt| {
            let index = (start + attempt as usize) % count;
            let model = models[index].as_str();
            async move {
                match llm.complete(model, prompt).await {
                    Ok(text) => Ok((index, text)),
                    Err(e) => {
                        tracing::warn!("{} model {} failed: {}", llm.name(), model, e);
                        Err(e)
                    }
                }
            }
        })
        .await?;

        self.preferred_model.store(index, Ordering::Relaxed);
        Ok(text)
    }
}

/// Invalid keys and rejected requests fail the same way on every model.
fn classify_model_error(err: &Error) -> RetryAction {
    if err.is_unrecoverable() || matches!(err, Error::Serialization(_)) {
        RetryAction::Abort
    } else {
        RetryAction::Retry(Backoff::None)
    }
}

fn parse_or_empty(response: &str, source: DetectionSource, subject: &str) -> TechnologyProfile {
    parse_technology_response(response, source).unwrap_or_else(|| {
        tracing::warn!("Unparseable model output for {}, using empty profile", subject);
        TechnologyProfile::default()
    })
}

/// Index of the first priority pattern in `path`, or `None` when unmatched.
pub fn file_priority(path: &str) -> Option<usize> {
    let lower = path.to_lowercase();
    FILE_PRIORITY_PATTERNS
        .iter()
        .position(|pattern| lower.contains(pattern))
}

/// Stable ordering by [`file_priority`]; unmatched files keep their
/// relative order after all matches.
pub fn prioritize_files(files: &[CodeFile]) -> Vec<&CodeFile> {
    let mut ordered: Vec<&CodeFile> = files.iter().collect();
    ordered.sort_by_key(|f| file_priority(&f.path).unwrap_or(FILE_PRIORITY_PATTERNS.len()));
    ordered
}

/// Lowercased text the verification step searches for technology names.
pub fn build_evidence_corpus<'a>(
    files: impl IntoIterator<Item = &'a CodeFile>,
    summary: Option<&RepositorySummary>,
) -> String {
    let mut corpus = String::new();

    for file in files {
        corpus.push_str(&file.path);
        corpus.push('\n');
        corpus.push_str(truncate_chars(&file.content, MAX_FILE_CHARS).0);
        corpus.push('\n');
    }

    if let Some(summary) = summary {
        corpus.push_str(&summary.name);
        corpus.push('\n');
        if let Some(desc) = &summary.description {
            corpus.push_str(desc);
            corpus.push('\n');
        }
        for item in summary
            .topics
            .iter()
            .chain(&summary.languages)
            .chain(&summary.key_files)
        {
            corpus.push_str(item);
            corpus.push('\n');
        }
    }

    corpus.to_lowercase()
}

/// Drops detections in hallucination-prone categories whose name never
/// appears in the evidence. Frameworks, languages and patterns are kept:
/// the prompt already demands evidence for them and name matching erases
/// legitimate results ("React" from `.jsx` files, "MVC" from layout).
pub fn verify_against_evidence(mut profile: TechnologyProfile, corpus: &str) -> TechnologyProfile {
    for category in TechnologyCategory::ALL {
        if !category.requires_verbatim_evidence() {
            continue;
        }
        profile.category_mut(category).retain(|detection| {
            let found = corpus.contains(&detection.key());
            if !found {
                tracing::debug!(
                    "Dropping {} '{}': not present in evidence",
                    category,
                    detection.name
                );
            }
            found
        });
    }
    profile
}
