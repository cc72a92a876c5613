//! Translation orchestration: settings, secrets, cache and provider gateway
//! composed into one best-effort `localize` call.

use crate::cache::{should_cache, TranslationCache, TranslationRequest, CACHE_TTL, FAILURE_MARKER};
use crate::config::{Settings, SettingsInput};
use crate::error::{GatewayError, LocalizeError};
use crate::locale::LocaleCode;
use crate::metrics::{MetricsReport, TranslationMetrics};
use crate::provider::{ProviderConfig, ProviderGateway, ProviderId};
use crate::secrets::SecretStore;
use crate::security::Viewer;
use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Strings shorter than this (after trimming) are never sent to a provider.
pub const MIN_TRANSLATABLE_CHARS: usize = 2;

fn unsafe_markup_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)<script|<iframe|javascript:").expect("Invalid unsafe markup regex")
    })
}

/// Whether `text` carries markup that must never reach a provider.
pub fn contains_unsafe_markup(text: &str) -> bool {
    unsafe_markup_regex().is_match(text)
}

/// `text` followed by an HTML comment describing `error`.
pub fn annotate_failure(text: &str, error: &GatewayError) -> String {
    format!(
        "{} {}: {}: {} -->",
        text,
        FAILURE_MARKER,
        error.category(),
        escape_html(&error.to_string())
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Result of [`TranslationService::save_settings`].
#[derive(Debug, Clone, Serialize)]
pub struct SaveOutcome {
    pub settings: Settings,
    pub warnings: Vec<String>,
    /// Cache entries removed by the save.
    pub invalidated: u64,
}

pub struct TranslationService {
    settings: RwLock<Settings>,
    secrets: Arc<dyn SecretStore>,
    cache: Arc<dyn TranslationCache>,
    gateway: ProviderGateway,
    metrics: TranslationMetrics,
}

impl TranslationService {
    pub fn new(
        settings: Settings,
        secrets: Arc<dyn SecretStore>,
        cache: Arc<dyn TranslationCache>,
        gateway: ProviderGateway,
    ) -> Self {
        Self {
            settings: RwLock::new(settings),
            secrets,
            cache,
            gateway,
            metrics: TranslationMetrics::new(),
        }
    }

    /// Copy of the current settings.
    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Translate `text` into `target`, never failing.
    ///
    /// Gateway errors yield the original text; privileged viewers also get an
    /// inline diagnostic comment appended.
    pub async fn localize(&self, text: &str, target: &LocaleCode, viewer: Viewer) -> String {
        let settings = self.settings().await;
        self.localize_with(&settings, text, target, viewer).await
    }

    pub async fn try_localize(&self, text: &str, target: &LocaleCode) -> Result<String, LocalizeError> {
        let settings = self.settings().await;
        self.try_localize_with(&settings, text, target).await
    }

    /// Translate body content.
    pub async fn translate_content(&self, text: &str, target: &LocaleCode, viewer: Viewer) -> String {
        self.localize(text, target, viewer).await
    }

    /// Translate a title. Whitespace-only titles are returned as-is.
    pub async fn translate_title(&self, title: &str, target: &LocaleCode, viewer: Viewer) -> String {
        if title.trim().is_empty() {
            return title.to_string();
        }
        self.localize(title, target, viewer).await
    }

    pub(crate) async fn localize_with(
        &self,
        settings: &Settings,
        text: &str,
        target: &LocaleCode,
        viewer: Viewer,
    ) -> String {
        match self.try_localize_with(settings, text, target).await {
            Ok(translated) => translated,
            Err(LocalizeError::Gateway(e)) if viewer.is_privileged() => annotate_failure(text, &e),
            Err(LocalizeError::Gateway(_)) => text.to_string(),
            Err(e) => {
                debug!("Returning original text for {}: {}", target, e);
                text.to_string()
            }
        }
    }

    pub(crate) async fn try_localize_with(
        &self,
        settings: &Settings,
        text: &str,
        target: &LocaleCode,
    ) -> Result<String, LocalizeError> {
        if settings.is_default(target)
            || text.is_empty()
            || text.trim().chars().count() < MIN_TRANSLATABLE_CHARS
        {
            return Ok(text.to_string());
        }

        if !settings.is_active(target) {
            return Err(LocalizeError::LocaleInvalid(target.to_string()));
        }

        if contains_unsafe_markup(text) {
            self.metrics.record_blocked();
            return Err(LocalizeError::ContentBlocked);
        }

        let request = TranslationRequest {
            source_text: text,
            target_locale: target,
            provider: settings.provider,
        };
        let fingerprint = request.fingerprint();

        match self.cache.get(&fingerprint).await {
            Ok(Some(cached)) => {
                self.metrics.record_cache_hit();
                debug!("Cache hit for {} ({})", fingerprint, target);
                return Ok(cached);
            }
            Ok(None) => {
                self.metrics.record_cache_miss();
                debug!("Cache miss for {} ({})", fingerprint, target);
            }
            Err(e) => {
                self.metrics.record_cache_miss();
                warn!("Cache read failed for {}, treating as miss: {:#}", fingerprint, e);
            }
        }

        let config = self.provider_config(settings.provider);
        self.metrics.record_api_call();
        let translated = self
            .gateway
            .translate(text, target, &config)
            .await
            .inspect_err(|_| self.metrics.record_api_failure())?;

        if should_cache(text, &translated) {
            if let Err(e) = self.cache.put(&fingerprint, &translated, CACHE_TTL).await {
                warn!("Cache write failed for {}: {:#}", fingerprint, e);
            }
        }

        Ok(translated)
    }

    fn provider_config(&self, provider_id: ProviderId) -> ProviderConfig {
        ProviderConfig {
            provider_id,
            google_key: self.secrets.get(ProviderId::Google),
            deepl_key: self.secrets.get(ProviderId::Deepl),
        }
    }

    /// Sanitize and apply new settings, clearing every cached translation.
    ///
    /// Keys present in `input` replace the stored ones; absent keys are kept.
    /// The cache is cleared before anything is applied, so a failed clear
    /// leaves settings and keys untouched.
    ///
    /// A request that snapshotted the old settings may still store its result
    /// after the clear. Such an entry is fingerprinted with the provider that
    /// produced it, so a provider switch never serves it, and it is tolerated.
    pub async fn save_settings(&self, input: &SettingsInput) -> Result<SaveOutcome> {
        let mut current = self.settings.write().await;
        let sanitized = Settings::sanitize(input, &current);

        for warning in &sanitized.warnings {
            warn!("Settings input corrected: {}", warning);
        }

        let invalidated = self
            .cache
            .invalidate_all()
            .await
            .context("Failed to invalidate translation cache, settings not saved")?;

        if let Some(key) = sanitized.google_key {
            self.secrets.set(ProviderId::Google, Some(key));
        }
        if let Some(key) = sanitized.deepl_key {
            self.secrets.set(ProviderId::Deepl, Some(key));
        }

        *current = sanitized.settings.clone();

        info!(
            "Settings saved: provider={}, default={}, active={}, {} cached translations cleared",
            current.provider,
            current.default_locale,
            current.active_locales.len(),
            invalidated
        );

        Ok(SaveOutcome {
            settings: sanitized.settings,
            warnings: sanitized.warnings,
            invalidated,
        })
    }

    /// Remove every cached translation.
    pub async fn clear_cache(&self) -> Result<u64> {
        let removed = self
            .cache
            .invalidate_all()
            .await
            .context("Failed to clear translation cache")?;
        info!("Translation cache cleared ({} entries)", removed);
        Ok(removed)
    }

    pub fn metrics(&self) -> MetricsReport {
        self.metrics.report()
    }

    /// Configuration problems an administrator should know about.
    pub async fn diagnostics(&self) -> Vec<String> {
        let settings = self.settings().await;
        let mut issues = Vec::new();

        let config = self.provider_config(settings.provider);
        if config.active_key().is_none() {
            issues.push(format!("No {} API key configured", settings.provider));
        }
        if settings.active_locales.is_empty() {
            issues.push("No active locales besides the default; nothing will be translated".to_string());
        }
        issues
    }
}
