use crate::models::RepositorySummary;

/// Characters of a file body sent to the model.
pub const MAX_FILE_CHARS: usize = 4000;

const RESPONSE_SCHEMA: &str = r#"Respond with exactly one JSON object and nothing else, using this schema:
{
    "languages": [{"name": "string", "confidence": 0.0-1.0}],
    "frameworks": [{"name": "string", "confidence": 0.0-1.0}],
    "libraries": [{"name": "string", "confidence": 0.0-1.0}],
    "databases": [{"name": "string", "confidence": 0.0-1.0}],
    "cloudServices": [{"name": "string", "confidence": 0.0-1.0}],
    "devOps": [{"name": "string", "confidence": 0.0-1.0}],
    "architecturalPatterns": [{"name": "string", "confidence": 0.0-1.0}]
}
Use an empty array for any category without evidence."#;

const EVIDENCE_RULES: &str = r#"Rules:
- Report ONLY technologies with explicit textual evidence: import/require/use statements, dependency entries, configuration keys, SDK or client construction, or recognizable service hostnames.
- Never infer a technology because it commonly pairs with the language or with another detected technology.
- Use the technology's canonical name as it appears in the evidence (e.g. "express", "postgres", "redis").
- Confidence reflects how unambiguous the evidence is, not how popular the technology is."#;

/// First `max_chars` characters of `content`, and whether anything was cut.
pub fn truncate_chars(content: &str, max_chars: usize) -> (&str, bool) {
    match content.char_indices().nth(max_chars) {
        Some((byte_index, _)) => (&content[..byte_index], true),
        None => (content, false),
    }
}

pub fn file_prompt(content: &str, filename: &str) -> String {
    let (snippet, truncated) = truncate_chars(content, MAX_FILE_CHARS);

    let mut prompt = format!(
        "You extract the technologies a source file demonstrably uses.\n\n{}\n\n{}\n\n",
        EVIDENCE_RULES, RESPONSE_SCHEMA
    );
    prompt.push_str(&format!("### File: {}\n", filename));
    if truncated {
        prompt.push_str(&format!(
            "(only the first {} of {} characters are shown)\n",
            MAX_FILE_CHARS,
            content.chars().count()
        ));
    }
    prompt.push_str("```\n");
    prompt.push_str(snippet);
    prompt.push_str("\n```\n");
    prompt
}

pub fn summary_prompt(summary: &RepositorySummary) -> String {
    let mut prompt = format!(
        "You extract the technologies a repository demonstrably uses, from its metadata only. No file contents are available.\n\n{}\n\n{}\n\n",
        EVIDENCE_RULES, RESPONSE_SCHEMA
    );

    prompt.push_str(&format!("Repository: {}\n", summary.name));
    if let Some(desc) = summary.description.as_deref().filter(|d| !d.is_empty()) {
        prompt.push_str(&format!("Description: {}\n", desc));
    }
    if !summary.topics.is_empty() {
        prompt.push_str(&format!("Topics: {}\n", summary.topics.join(", ")));
    }
    if !summary.languages.is_empty() {
        prompt.push_str(&format!("Detected languages: {}\n", summary.languages.join(", ")));
    }
    if !summary.key_files.is_empty() {
        prompt.push_str("Key files:\n");
        for file in &summary.key_files {
            prompt.push_str(&format!("- {}\n", file));
        }
    }
    prompt
}
