//! Provider metadata: what `GET /providers` reports.

use crate::settings::{ProviderId, Settings};
use serde::Serialize;

/// Provider metadata exposed to the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub id: ProviderId,
    pub name: String,
    pub env_key: String,
    pub model: String,
    pub configured: bool,
}

/// All known providers and their display info.
pub fn all_providers(settings: &Settings) -> Vec<ProviderInfo> {
    ProviderId::ALL
        .iter()
        .map(|&id| {
            let provider = settings.provider_settings(id);
            ProviderInfo {
                id,
                name: display_name(id).to_string(),
                env_key: id.env_key().to_string(),
                model: provider.model.clone(),
                configured: provider.is_configured(),
            }
        })
        .collect()
}

/// Check if a provider has an API key configured.
pub fn is_provider_configured(settings: &Settings, id: ProviderId) -> bool {
    settings.provider_settings(id).is_configured()
}

/// Provider configuration summary, as served by `GET /providers`.
pub fn provider_config(settings: &Settings) -> serde_json::Value {
    let providers = all_providers(settings);
    let configured: Vec<ProviderId> = providers
        .iter()
        .filter(|p| p.configured)
        .map(|p| p.id)
        .collect();

    serde_json::json!({
        "activeProvider": settings.provider,
        "providers": providers,
        "configuredProviders": configured,
    })
}

fn display_name(id: ProviderId) -> &'static str {
    match id {
        ProviderId::Gemini => "Google Gemini",
        ProviderId::Anthropic => "Anthropic Claude",
    }
}
