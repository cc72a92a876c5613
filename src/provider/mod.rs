//! Provider gateway: a uniform interface over translation backends.
//!
//! Each backend implements [`TranslationProvider`]. The [`ProviderGateway`]
//! owns the registered backends, checks the active key before any network
//! traffic, and dispatches by [`ProviderId`]. Adding a backend means adding a
//! variant and registering an implementation; callers of
//! [`ProviderGateway::translate`] do not change.

mod deepl;
mod google;

pub use deepl::{deepl_target_code, is_free_key, DeepL};
pub use google::GoogleTranslate;

use crate::error::GatewayError;
use crate::locale::LocaleCode;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Outbound request timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Identifies a translation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Google Cloud Translation v2 (simple API key)
    Google,
    /// DeepL (free/pro key tiers)
    Deepl,
}

impl ProviderId {
    /// Stable lower-case identifier, used in settings and cache fingerprints.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Google => "google",
            ProviderId::Deepl => "deepl",
        }
    }

    /// Parse a settings value. Accepts only the documented identifiers.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "google" => Some(ProviderId::Google),
            "deepl" => Some(ProviderId::Deepl),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderId::Google => f.write_str("Google"),
            ProviderId::Deepl => f.write_str("DeepL"),
        }
    }
}

/// Endpoint URLs for the built-in backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub google: String,
    pub deepl_free: String,
    pub deepl_pro: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            google: "https://translation.googleapis.com/language/translate/v2".to_string(),
            deepl_free: "https://api-free.deepl.com/v2/translate".to_string(),
            deepl_pro: "https://api.deepl.com/v2/translate".to_string(),
        }
    }
}

/// Decrypted provider settings for a single call.
///
/// Built right before a gateway call from the secret store and dropped
/// afterwards; keys are never written anywhere from here.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub provider_id: ProviderId,
    pub google_key: Option<String>,
    pub deepl_key: Option<String>,
}

impl ProviderConfig {
    /// Key for the active provider, if present and non-blank.
    pub fn active_key(&self) -> Option<&str> {
        let key = match self.provider_id {
            ProviderId::Google => self.google_key.as_deref(),
            ProviderId::Deepl => self.deepl_key.as_deref(),
        };
        key.map(str::trim).filter(|k| !k.is_empty())
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider_id", &self.provider_id)
            .field("google_key", &self.google_key.as_ref().map(|_| "<redacted>"))
            .field("deepl_key", &self.deepl_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A translation backend.
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Translate `text` into `target` using an already-validated, non-empty key.
    async fn translate(
        &self,
        text: &str,
        target: &LocaleCode,
        api_key: &str,
    ) -> Result<String, GatewayError>;
}

/// Dispatches translation calls to the configured backend.
#[derive(Clone, Default)]
pub struct ProviderGateway {
    providers: Vec<Arc<dyn TranslationProvider>>,
}

impl ProviderGateway {
    /// Gateway with the two built-in backends sharing one HTTP client.
    pub fn new(endpoints: ProviderEndpoints, timeout: Duration) -> Result<Self> {
        let client = http_client(timeout)?;
        Ok(Self::default()
            .register(Arc::new(GoogleTranslate::new(
                client.clone(),
                endpoints.google,
            )))
            .register(Arc::new(DeepL::new(
                client,
                endpoints.deepl_free,
                endpoints.deepl_pro,
            ))))
    }

    /// Register a backend, replacing any previous one with the same id.
    pub fn register(mut self, provider: Arc<dyn TranslationProvider>) -> Self {
        let id = provider.id();
        self.providers.retain(|existing| existing.id() != id);
        self.providers.push(provider);
        self
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Translate `text` with the provider selected by `config`.
    ///
    /// Returns `NoKeyConfigured` without any network call when the active
    /// provider has no key. Failures are logged here and returned as-is;
    /// this layer never retries.
    pub async fn translate(
        &self,
        text: &str,
        target: &LocaleCode,
        config: &ProviderConfig,
    ) -> Result<String, GatewayError> {
        let provider_id = config.provider_id;

        let Some(api_key) = config.active_key() else {
            warn!("{} translation skipped: no API key configured", provider_id);
            return Err(GatewayError::NoKeyConfigured(provider_id));
        };

        let provider = self
            .providers
            .iter()
            .find(|p| p.id() == provider_id)
            .ok_or_else(|| {
                GatewayError::ProviderRejected(format!("{} provider is not registered", provider_id))
            })?;

        provider
            .translate(text, target, api_key)
            .await
            .inspect_err(|e| {
                warn!(
                    "{} API error ({}) translating to {}: {}",
                    provider_id,
                    e.category(),
                    target,
                    e
                );
            })
    }
}

/// Shared HTTP client for provider calls (rustls, certificate verification on).
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client for translation providers")
}

pub(crate) fn transport_error(provider: ProviderId, err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Transport(format!("{} request timed out", provider))
    } else {
        GatewayError::Transport(format!("{} request failed: {}", provider, err))
    }
}
