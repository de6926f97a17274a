//! LLM domain: the oracle behind classification and ideation.
//!
//! Public API for the two hosted-model calls EcoScan makes.
//! External code should only use the `Oracle` trait and what is exported here.
//!
//! Providers:
//!   - Google Gemini (gemini.rs)
//!   - Anthropic Claude (anthropic.rs)
//!
//! Shared:
//!   - parse.rs: response envelope extraction + fence stripping
//!   - provider.rs: provider metadata for the dashboard

mod anthropic;
mod gemini;
pub mod parse;
pub mod prompts;
pub mod provider;
pub mod types;

pub use types::{ClassificationResult, ConfidenceBand, Disposition, IdeaList};

use crate::capture::CapturedImage;
use crate::error::{ClassificationError, IdeationError, SettingsError};
use crate::settings::{ProviderId, Settings};
use anthropic::AnthropicClient;
use async_trait::async_trait;
use gemini::GeminiClient;
use std::time::Instant;

/// The external reasoning service, reduced to its JSON contract.
///
/// A failed call is terminal for that request; implementations never retry.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn classify(&self, image: &CapturedImage)
        -> Result<ClassificationResult, ClassificationError>;

    async fn generate_ideas(&self, component_type: &str) -> Result<IdeaList, IdeationError>;
}

enum Backend {
    Gemini(GeminiClient),
    Anthropic(AnthropicClient),
}

/// Oracle backed by the provider picked in `Settings`.
pub struct HostedOracle {
    provider: ProviderId,
    backend: Backend,
}

impl HostedOracle {
    pub fn from_settings(settings: &Settings) -> Result<Self, SettingsError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| SettingsError::HttpClient(e.to_string()))?;

        let provider = settings.provider;
        let provider_settings = settings.provider_settings(provider).clone();
        if !provider_settings.is_configured() {
            log::warn!(
                "[LLM] No {} set; oracle calls will fail until a key is configured",
                provider.env_key()
            );
        }
        log::info!("[LLM] Provider: {} ({})", provider, provider_settings.model);

        let backend = match provider {
            ProviderId::Gemini => Backend::Gemini(GeminiClient::new(http, provider_settings)),
            ProviderId::Anthropic => {
                Backend::Anthropic(AnthropicClient::new(http, provider_settings))
            }
        };
        Ok(Self { provider, backend })
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }
}

#[async_trait]
impl Oracle for HostedOracle {
    async fn classify(
        &self,
        image: &CapturedImage,
    ) -> Result<ClassificationResult, ClassificationError> {
        let start = Instant::now();
        log::info!(
            "[LLM] Classify via {}: {} {} bytes",
            self.provider,
            image.mime_type(),
            image.bytes().len()
        );

        let outcome = match &self.backend {
            Backend::Gemini(client) => client.classify(image).await,
            Backend::Anthropic(client) => client.classify(image).await,
        };

        match &outcome {
            Ok(result) => log::info!(
                "[LLM] Classified as '{}' (recyclable={}, hazard={}, confidence={:.2}) in {}ms",
                result.component_type,
                result.recyclable,
                result.hazard_flag,
                result.confidence_score,
                start.elapsed().as_millis()
            ),
            Err(e) => log::warn!(
                "[LLM] Classification failed after {}ms: {}",
                start.elapsed().as_millis(),
                e
            ),
        }
        outcome.map_err(ClassificationError)
    }

    async fn generate_ideas(&self, component_type: &str) -> Result<IdeaList, IdeationError> {
        let component_type = component_type.trim();
        if component_type.is_empty() {
            return Err(IdeationError::EmptyComponentType);
        }

        let start = Instant::now();
        let outcome = match &self.backend {
            Backend::Gemini(client) => client.generate_ideas(component_type).await,
            Backend::Anthropic(client) => client.generate_ideas(component_type).await,
        };

        match &outcome {
            Ok(list) => log::info!(
                "[LLM] {} ideas for '{}' in {}ms",
                list.ideas.len(),
                component_type,
                start.elapsed().as_millis()
            ),
            Err(e) => log::warn!("[LLM] Ideation for '{}' failed: {}", component_type, e),
        }
        Ok(outcome?)
    }
}
