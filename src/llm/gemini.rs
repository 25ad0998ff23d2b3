use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::llm::provider::LLMProvider;

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct GeminiError {
    message: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: GeminiError,
}

impl GeminiProvider {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(api_key, GEMINI_API_URL)
    }

    pub fn with_base_url(api_key: String, base_url: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config("Gemini API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String> {
        tracing::debug!("Sending ~{} tokens to {}", prompt.len() / 4, model);

        let request_body = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                max_output_tokens: 2048,
                response_mime_type: "application/json".to_string(),
            },
        };

        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(Error::LLMApi {
                status: Some(status.as_u16()),
                message: format!("{}: {}", model, message),
            });
        }

        let body = response.text().await?;
        let result: GenerateResponse = serde_json::from_str(&body).map_err(|e| Error::LLMApi {
            status: None,
            message: format!("Failed to parse Gemini response: {}", e),
        })?;

        if let Some(error) = result.error {
            return Err(Error::LLMApi {
                status: None,
                message: error.message,
            });
        }

        let text = result
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(Error::LLMApi {
                status: None,
                message: format!("Empty response from {}", model),
            });
        }

        Ok(text)
    }

    fn name(&self) -> &str {
        "Gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_rejected() {
        assert!(matches!(
            GeminiProvider::new("  ".to_string()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some("hi".to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                max_output_tokens: 10,
                response_mime_type: "application/json".to_string(),
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 10);
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
    }
}
