//! Anthropic Claude provider: Messages API with a base64 image block.
//!
//! Claude has no JSON response mode, so the reply may come back wrapped in a
//! markdown fence; it is stripped before parsing.

use super::parse;
use super::prompts::{self, CLASSIFY_SYSTEM_PROMPT, CLASSIFY_USER_MESSAGE, IDEATE_SYSTEM_PROMPT};
use super::types::{ClassificationResult, IdeaList};
use crate::capture::CapturedImage;
use crate::error::OracleError;
use crate::settings::ProviderSettings;
use serde_json::{json, Value};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    http: reqwest::Client,
    settings: ProviderSettings,
}

impl AnthropicClient {
    pub fn new(http: reqwest::Client, settings: ProviderSettings) -> Self {
        Self { http, settings }
    }

    pub async fn classify(&self, image: &CapturedImage) -> Result<ClassificationResult, OracleError> {
        let content = json!([
            {
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image.mime_type(),
                    "data": image.to_base64()
                }
            },
            { "type": "text", "text": CLASSIFY_USER_MESSAGE }
        ]);
        let text = self.message(CLASSIFY_SYSTEM_PROMPT, content).await?;
        ClassificationResult::from_model_json(&parse::strip_code_fences(&text))
    }

    pub async fn generate_ideas(&self, component_type: &str) -> Result<IdeaList, OracleError> {
        let content = json!(prompts::build_ideate_message(component_type));
        let text = self.message(IDEATE_SYSTEM_PROMPT, content).await?;
        IdeaList::from_model_json(&parse::strip_code_fences(&text))
    }

    async fn message(&self, system: &str, content: Value) -> Result<String, OracleError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(OracleError::MissingApiKey("anthropic"))?;

        log::info!("[LLM] Model: {}", self.settings.model);
        let start = std::time::Instant::now();

        let response = self
            .http
            .post(format!("{}/v1/messages", self.settings.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&json!({
                "model": self.settings.model,
                "max_tokens": self.settings.max_tokens,
                "system": system,
                "messages": [{"role": "user", "content": content}]
            }))
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            log::error!("[LLM] API returned {}: {}", status, parse::truncate(&raw));
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: parse::truncate(&raw),
            });
        }
        log::info!("[LLM] API latency: {}ms", start.elapsed().as_millis());

        let body: Value = serde_json::from_str(&raw)?;
        if let Some(usage) = body.get("usage") {
            log::info!(
                "[LLM] Tokens: input={} output={}",
                usage["input_tokens"].as_u64().unwrap_or(0),
                usage["output_tokens"].as_u64().unwrap_or(0)
            );
        }

        parse::extract_anthropic_text(&body).ok_or(OracleError::EmptyResponse)
    }
}
