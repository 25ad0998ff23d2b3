use serde_json::Value;

use crate::models::{DetectionSource, TechnologyCategory, TechnologyDetection, TechnologyProfile};

/// Confidence given to items the model returned as bare strings.
const BARE_NAME_CONFIDENCE: f32 = 1.0;

/// Reads a technology profile out of a model response. Missing or
/// malformed categories become empty; `None` means no JSON object could be
/// recovered at all.
pub fn parse_technology_response(response: &str, source: DetectionSource) -> Option<TechnologyProfile> {
    let json_str = extract_json(response)?;
    let value: Value = match serde_json::from_str(json_str) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Model response is not valid JSON: {}", e);
            return None;
        }
    };
    let object = value.as_object()?;

    let mut profile = TechnologyProfile::default();
    for category in TechnologyCategory::ALL {
        let Some(items) = object.get(category.key()).and_then(Value::as_array) else {
            continue;
        };
        for item in items {
            if let Some((name, confidence)) = parse_item(item) {
                profile.insert_max(category, TechnologyDetection::new(name, confidence, source));
            }
        }
    }

    Some(profile)
}

fn parse_item(item: &Value) -> Option<(String, f32)> {
    let (name, confidence) = match item {
        Value::String(name) => (name.as_str(), BARE_NAME_CONFIDENCE),
        Value::Object(fields) => {
            let name = fields.get("name")?.as_str()?;
            let confidence = match fields.get("confidence") {
                None | Some(Value::Null) => BARE_NAME_CONFIDENCE,
                Some(value) => value.as_f64()? as f32,
            };
            (name, confidence)
        }
        _ => return None,
    };

    let name = name.trim();
    if name.is_empty() || !confidence.is_finite() {
        return None;
    }
    Some((name.to_string(), confidence))
}

fn extract_json(text: &str) -> Option<&str> {
    // Fenced block first
    if let Some(start) = text.find("```") {
        let after_fence = start + 3;
        let body_start = text[after_fence..]
            .find('\n')
            .map(|i| after_fence + i + 1)
            .unwrap_or(after_fence);
        if let Some(end) = text[body_start..].find("```") {
            let content = text[body_start..body_start + end].trim();
            if content.starts_with('{') {
                if let Some(object) = balanced_object(content) {
                    return Some(object);
                }
                // Truncated fenced object: a later object may still be complete.
                if let Some(object) = balanced_object(&text[body_start + end + 3..]) {
                    return Some(object);
                }
            }
        }
    }

    balanced_object(text)
}

/// First balanced `{...}` in `text`, skipping braces inside strings.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in text[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}
