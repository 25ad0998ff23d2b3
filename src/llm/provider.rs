use async_trait::async_trait;

use crate::error::Result;

/// A text-completion endpoint addressed by model id.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Sends `prompt` to `model` and returns the raw response text.
    async fn complete(&self, model: &str, prompt: &str) -> Result<String>;
    fn name(&self) -> &str;
}
