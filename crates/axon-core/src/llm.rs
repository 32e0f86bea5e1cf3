//! LLM bridge: OpenRouter-compatible chat completion behind a trait seam.
//!
//! Pipelines depend on `Arc<dyn LanguageModel>` so tests can script responses.
//! The bridge owns the request timeout; callers never add their own. Models
//! frequently wrap JSON in markdown code fences — parse through
//! [`strip_code_fences`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "meta-llama/llama-3.3-70b-instruct";

/// One chat message handed to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Text-generation seam. The shared client handles cancellation and timeout.
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(
        &self,
        messages: &[ChatTurn],
        system: Option<&str>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// Strips a leading/trailing markdown code fence (with optional language tag)
/// so fenced JSON can be fed straight to serde.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag line ("json", "JSON", or empty).
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => return trimmed,
    };
    body.trim_end()
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or_else(|| body.trim())
}

// OpenAI-compatible request/response for OpenRouter
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatTurn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

/// Reqwest-based OpenRouter client. API key from `OPENROUTER_API_KEY`.
pub struct OpenRouterBridge {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenRouterBridge {
    /// Builds a bridge from `OPENROUTER_API_KEY`. Returns `None` when unset or empty.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var("OPENROUTER_API_KEY").ok()?.trim().to_string();
        if key.is_empty() {
            return None;
        }
        Some(Self::new(key))
    }

    pub fn new(api_key: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            client,
        }
    }

    /// Sets the model (e.g. `anthropic/claude-3.5-sonnet`).
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }
}

#[async_trait::async_trait]
impl LanguageModel for OpenRouterBridge {
    async fn generate(
        &self,
        messages: &[ChatTurn],
        system: Option<&str>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let mut all = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = system {
            all.push(ChatTurn {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        all.extend(messages.iter().cloned());

        let url = format!("{}/chat/completions", OPENROUTER_API_BASE);
        let body = ChatRequest {
            model: self.model.clone(),
            messages: all,
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
        };

        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("OpenRouter request failed: {}", e))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(format!("OpenRouter API error {}: {}", status, body).into());
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| format!("OpenRouter response parse failed: {}", e))?;

        Ok(parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_fences_plain_text_untouched() {
        assert_eq!(strip_code_fences("  {\"a\": 1}  "), "{\"a\": 1}");
    }

    #[test]
    fn strip_fences_with_language_tag() {
        let fenced = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"a\": 1}");
    }

    #[test]
    fn strip_fences_without_language_tag() {
        let fenced = "```\n[1, 2]\n```";
        assert_eq!(strip_code_fences(fenced), "[1, 2]");
    }

    #[test]
    fn strip_fences_unterminated_returns_body() {
        let fenced = "```json\n{\"a\": 1}";
        assert_eq!(strip_code_fences(fenced), "{\"a\": 1}");
    }
}
