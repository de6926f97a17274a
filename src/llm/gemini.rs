//! Google Gemini provider: `generateContent` via the Google AI API.
//!
//! Key differences from Anthropic:
//! - API key in the `x-goog-api-key` header
//! - `responseMimeType: "application/json"` enforces valid JSON
//! - Image goes in as an `inlineData` part
//! - Text in `candidates[0].content.parts[*].text`
//! - Token usage in `usageMetadata`

use super::parse;
use super::prompts::{self, CLASSIFY_SYSTEM_PROMPT, CLASSIFY_USER_MESSAGE, IDEATE_SYSTEM_PROMPT};
use super::types::{ClassificationResult, IdeaList};
use crate::capture::CapturedImage;
use crate::error::OracleError;
use crate::settings::ProviderSettings;
use serde_json::{json, Value};

pub struct GeminiClient {
    http: reqwest::Client,
    settings: ProviderSettings,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, settings: ProviderSettings) -> Self {
        Self { http, settings }
    }

    pub async fn classify(&self, image: &CapturedImage) -> Result<ClassificationResult, OracleError> {
        let parts = json!([
            {
                "inlineData": {
                    "mimeType": image.mime_type(),
                    "data": image.to_base64()
                }
            },
            { "text": CLASSIFY_USER_MESSAGE }
        ]);
        let text = self.generate(CLASSIFY_SYSTEM_PROMPT, parts).await?;
        ClassificationResult::from_model_json(&parse::strip_code_fences(&text))
    }

    pub async fn generate_ideas(&self, component_type: &str) -> Result<IdeaList, OracleError> {
        let parts = json!([{ "text": prompts::build_ideate_message(component_type) }]);
        let text = self.generate(IDEATE_SYSTEM_PROMPT, parts).await?;
        IdeaList::from_model_json(&parse::strip_code_fences(&text))
    }

    /// One non-streaming `generateContent` round trip; returns the model text.
    async fn generate(&self, system: &str, parts: Value) -> Result<String, OracleError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(OracleError::MissingApiKey("gemini"))?;

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url, self.settings.model
        );
        log::info!("[LLM] Model: {}", self.settings.model);

        let start = std::time::Instant::now();
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .header("content-type", "application/json")
            .json(&json!({
                "contents": [
                    {
                        "role": "user",
                        "parts": parts
                    }
                ],
                "systemInstruction": {
                    "parts": [
                        {
                            "text": system
                        }
                    ]
                },
                "generationConfig": {
                    "maxOutputTokens": self.settings.max_tokens,
                    "temperature": 0.2,
                    "responseMimeType": "application/json"
                }
            }))
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            log::error!("[LLM] Gemini API returned {}: {}", status, parse::truncate(&raw));
            return Err(OracleError::Status {
                status: status.as_u16(),
                body: parse::truncate(&raw),
            });
        }
        log::info!("[LLM] Gemini latency: {}ms", start.elapsed().as_millis());

        let body: Value = serde_json::from_str(&raw)?;
        if let Some(usage) = body.get("usageMetadata") {
            log::info!(
                "[LLM] Tokens: input={} output={}",
                usage["promptTokenCount"].as_u64().unwrap_or(0),
                usage["candidatesTokenCount"].as_u64().unwrap_or(0)
            );
        }

        parse::extract_gemini_text(&body).ok_or_else(|| {
            log::warn!("[LLM] Gemini response had no text: {}", parse::truncate(&raw));
            OracleError::EmptyResponse
        })
    }
}
