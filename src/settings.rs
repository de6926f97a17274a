//! Runtime configuration and provider resolution.
//!
//! Everything is read from environment variables, optionally seeded from a
//! `.env.local` / `.env` file. `Settings::from_lookup` takes the lookup as a
//! closure so tests never have to touch the process environment.

use crate::capture::{CameraDevice, NoCamera, StillCamera};
use crate::error::SettingsError;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:9002";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const ANTHROPIC_MODEL: &str = "claude-haiku-4-5-20251001";

const ENV_FILES: [&str; 2] = [".env.local", ".env"];

// ── Providers ───────────────────────────────────────────────────────

/// Hosted model providers the oracle can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Gemini,
    Anthropic,
}

impl ProviderId {
    pub const ALL: [ProviderId; 2] = [ProviderId::Gemini, ProviderId::Anthropic];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "gemini",
            ProviderId::Anthropic => "anthropic",
        }
    }

    /// Primary environment variable holding this provider's API key.
    pub fn env_key(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "GEMINI_API_KEY",
            ProviderId::Anthropic => "ANTHROPIC_API_KEY",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "gemini" | "google" | "googleai" => Some(ProviderId::Gemini),
            "anthropic" | "claude" => Some(ProviderId::Anthropic),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection details for one provider.
#[derive(Clone)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
}

impl std::fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ProviderSettings {
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

// ── Camera ──────────────────────────────────────────────────────────

/// Which camera backend the scan workflow drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraSetting {
    None,
    Still(PathBuf),
    Screen,
}

impl CameraSetting {
    fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Some(path) = value.strip_prefix("still:") {
            return (!path.is_empty()).then(|| CameraSetting::Still(PathBuf::from(path)));
        }
        match value.to_lowercase().as_str() {
            "none" | "off" => Some(CameraSetting::None),
            "screen" => Some(CameraSetting::Screen),
            _ => None,
        }
    }
}

// ── Settings ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Settings {
    pub provider: ProviderId,
    pub gemini: ProviderSettings,
    pub anthropic: ProviderSettings,
    pub bind: SocketAddr,
    pub timeout: Duration,
    pub max_body_bytes: usize,
    pub camera: CameraSetting,
}

impl Settings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let max_tokens = parse_or(&get, "LLM_MAX_TOKENS", crate::llm::prompts::MAX_TOKENS)?;

        let gemini = ProviderSettings {
            api_key: get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")),
            base_url: trim_base(get("GEMINI_BASE_URL").unwrap_or_else(|| GEMINI_BASE_URL.into())),
            model: get("GEMINI_MODEL").unwrap_or_else(|| GEMINI_MODEL.into()),
            max_tokens,
        };
        let anthropic = ProviderSettings {
            api_key: get("ANTHROPIC_API_KEY"),
            base_url: trim_base(
                get("ANTHROPIC_BASE_URL").unwrap_or_else(|| ANTHROPIC_BASE_URL.into()),
            ),
            model: get("ANTHROPIC_MODEL").unwrap_or_else(|| ANTHROPIC_MODEL.into()),
            max_tokens,
        };

        let provider = resolve_provider(get("LLM_PROVIDER").as_deref(), &gemini, &anthropic)?;

        let bind = parse_or(
            &get,
            "ECOSCAN_BIND",
            DEFAULT_BIND.parse::<SocketAddr>().map_err(|_| SettingsError::InvalidValue {
                key: "ECOSCAN_BIND",
                value: DEFAULT_BIND.into(),
            })?,
        )?;
        let timeout_secs: u64 = parse_or(&get, "ECOSCAN_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(SettingsError::InvalidValue {
                key: "ECOSCAN_TIMEOUT_SECS",
                value: "0".into(),
            });
        }
        let max_body_bytes = parse_or(&get, "ECOSCAN_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?;

        let camera = match get("ECOSCAN_CAMERA") {
            Some(raw) => CameraSetting::parse(&raw).ok_or(SettingsError::InvalidValue {
                key: "ECOSCAN_CAMERA",
                value: raw,
            })?,
            None => CameraSetting::None,
        };

        Ok(Self {
            provider,
            gemini,
            anthropic,
            bind,
            timeout: Duration::from_secs(timeout_secs),
            max_body_bytes,
            camera,
        })
    }

    pub fn provider_settings(&self, id: ProviderId) -> &ProviderSettings {
        match id {
            ProviderId::Gemini => &self.gemini,
            ProviderId::Anthropic => &self.anthropic,
        }
    }

    /// Build the configured camera backend.
    pub fn camera_device(&self) -> Result<Arc<dyn CameraDevice>, SettingsError> {
        match &self.camera {
            CameraSetting::None => Ok(Arc::new(NoCamera)),
            CameraSetting::Still(path) => Ok(Arc::new(StillCamera::new(path.clone()))),
            #[cfg(feature = "screen-camera")]
            CameraSetting::Screen => Ok(Arc::new(crate::capture::ScreenCamera)),
            #[cfg(not(feature = "screen-camera"))]
            CameraSetting::Screen => Err(SettingsError::CameraUnsupported("screen".into())),
        }
    }
}

/// Determine which provider to use.
///
/// Priority:
/// 1. LLM_PROVIDER (explicit override: "gemini" or "anthropic")
/// 2. First provider with an API key set
/// 3. "gemini" as final default (calls will fail until a key is set)
pub fn resolve_provider(
    explicit: Option<&str>,
    gemini: &ProviderSettings,
    anthropic: &ProviderSettings,
) -> Result<ProviderId, SettingsError> {
    if let Some(raw) = explicit {
        let id = ProviderId::parse(raw).ok_or_else(|| SettingsError::InvalidValue {
            key: "LLM_PROVIDER",
            value: raw.to_string(),
        })?;
        log::info!("[SETTINGS] Provider override: {}", id);
        return Ok(id);
    }
    if gemini.is_configured() {
        return Ok(ProviderId::Gemini);
    }
    if anthropic.is_configured() {
        return Ok(ProviderId::Anthropic);
    }
    Ok(ProviderId::Gemini)
}

/// Load the first `.env.local` / `.env` found in the working directory,
/// then in `<config dir>/ecoscan/`. Existing variables are never overridden.
///
/// Runs before the logger exists, so it reports on stderr.
pub fn load_env_files() -> Option<PathBuf> {
    let mut dirs_to_search = vec![PathBuf::from(".")];
    if let Some(config) = dirs::config_dir() {
        dirs_to_search.push(config.join("ecoscan"));
    }

    for dir in dirs_to_search {
        for env_file in ENV_FILES {
            let path = dir.join(env_file);
            if !path.exists() {
                continue;
            }
            match dotenvy::from_path(&path) {
                Ok(()) => {
                    eprintln!("[STARTUP] Loaded {}", path.display());
                    return Some(path);
                }
                Err(e) => eprintln!("[STARTUP] Failed to load {}: {}", path.display(), e),
            }
        }
    }
    None
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, SettingsError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SettingsError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}

fn trim_base(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<Settings, SettingsError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_any_variables() {
        let s = settings(&[]).unwrap();
        assert_eq!(s.provider, ProviderId::Gemini);
        assert_eq!(s.bind, DEFAULT_BIND.parse().unwrap());
        assert_eq!(s.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(s.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(s.camera, CameraSetting::None);
        assert!(!s.gemini.is_configured());
        assert_eq!(s.gemini.model, GEMINI_MODEL);
    }

    #[test]
    fn first_configured_key_wins() {
        let s = settings(&[("ANTHROPIC_API_KEY", "sk-test")]).unwrap();
        assert_eq!(s.provider, ProviderId::Anthropic);
    }

    #[test]
    fn explicit_override_beats_configured_key() {
        let s = settings(&[("ANTHROPIC_API_KEY", "sk-test"), ("LLM_PROVIDER", "Gemini")]).unwrap();
        assert_eq!(s.provider, ProviderId::Gemini);
    }

    #[test]
    fn unknown_provider_is_an_error() {
        let err = settings(&[("LLM_PROVIDER", "palm")]).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { key: "LLM_PROVIDER", .. }));
    }

    #[test]
    fn google_api_key_is_accepted_for_gemini() {
        let s = settings(&[("GOOGLE_API_KEY", "g-key")]).unwrap();
        assert_eq!(s.gemini.api_key.as_deref(), Some("g-key"));
    }

    #[test]
    fn empty_values_count_as_unset() {
        let s = settings(&[("GEMINI_API_KEY", "  "), ("ECOSCAN_BIND", "")]).unwrap();
        assert!(!s.gemini.is_configured());
        assert_eq!(s.bind, DEFAULT_BIND.parse().unwrap());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let s = settings(&[("GEMINI_BASE_URL", "http://127.0.0.1:9999/")]).unwrap();
        assert_eq!(s.gemini.base_url, "http://127.0.0.1:9999");
    }

    #[test]
    fn still_camera_path_is_parsed() {
        let s = settings(&[("ECOSCAN_CAMERA", "still:/tmp/frame.jpg")]).unwrap();
        assert_eq!(s.camera, CameraSetting::Still(PathBuf::from("/tmp/frame.jpg")));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        assert!(settings(&[("ECOSCAN_TIMEOUT_SECS", "soon")]).is_err());
        assert!(settings(&[("ECOSCAN_TIMEOUT_SECS", "0")]).is_err());
        assert!(settings(&[("ECOSCAN_CAMERA", "webcam")]).is_err());
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let s = settings(&[("GEMINI_API_KEY", "super-secret")]).unwrap();
        let debug = format!("{:?}", s);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
