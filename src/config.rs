use crate::locale::LocaleCode;
use crate::provider::{ProviderEndpoints, ProviderId, DEFAULT_REQUEST_TIMEOUT};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,
    pub site_url: String,
    pub admin_token: Option<String>,

    // Cache
    pub database_url: String,

    // Provider
    pub provider: ProviderId,
    pub google_api_key: Option<String>,
    pub deepl_api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub endpoints: ProviderEndpoints,

    // Locales
    pub default_locale: LocaleCode,
    pub active_locales: Vec<LocaleCode>,
    pub seo_enabled: bool,
    /// Optional JSON file of slug rewrite rules.
    pub rewrite_rules_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = ProviderEndpoints::default();

        let provider = match non_empty_var("TRANSLATION_PROVIDER") {
            Some(raw) => ProviderId::parse(&raw)
                .with_context(|| format!("TRANSLATION_PROVIDER must be 'google' or 'deepl', got '{}'", raw))?,
            None => ProviderId::Google,
        };

        let default_locale = match non_empty_var("DEFAULT_LOCALE") {
            Some(raw) => LocaleCode::parse(&raw).context("DEFAULT_LOCALE is not a two-letter code")?,
            None => LocaleCode::parse("en")?,
        };

        let active_locales = non_empty_var("ACTIVE_LOCALES")
            .map(|raw| parse_locale_list(&raw))
            .transpose()
            .context("ACTIVE_LOCALES must be a comma-separated list of two-letter codes")?
            .unwrap_or_default();

        Ok(Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            site_url: std::env::var("SITE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string())
                .trim_end_matches('/')
                .to_string(),
            admin_token: non_empty_var("ADMIN_TOKEN"),

            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://polyglot-cache.db".to_string()),

            provider,
            google_api_key: non_empty_var("GOOGLE_API_KEY"),
            deepl_api_key: non_empty_var("DEEPL_API_KEY"),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT.as_secs()),
            endpoints: ProviderEndpoints {
                google: std::env::var("GOOGLE_API_URL").unwrap_or(defaults.google),
                deepl_free: std::env::var("DEEPL_FREE_API_URL").unwrap_or(defaults.deepl_free),
                deepl_pro: std::env::var("DEEPL_PRO_API_URL").unwrap_or(defaults.deepl_pro),
            },

            default_locale,
            active_locales,
            seo_enabled: std::env::var("SEO_ENABLED")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
            rewrite_rules_path: non_empty_var("REWRITE_RULES_PATH").map(PathBuf::from),
        })
    }

    /// Initial runtime settings derived from the environment.
    pub fn settings(&self) -> Settings {
        Settings::new(
            self.provider,
            self.default_locale.clone(),
            self.active_locales.clone(),
            self.seo_enabled,
        )
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_locale_list(raw: &str) -> Result<Vec<LocaleCode>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| LocaleCode::parse(s).map_err(anyhow::Error::from))
        .collect()
}

/// Runtime translation settings, replaceable through the admin surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub provider: ProviderId,
    pub default_locale: LocaleCode,
    /// Locales besides the default that are enabled. Never contains the default.
    pub active_locales: Vec<LocaleCode>,
    pub seo_enabled: bool,
}

impl Settings {
    /// Build settings, dropping duplicates and the default from the active set.
    pub fn new(
        provider: ProviderId,
        default_locale: LocaleCode,
        active_locales: Vec<LocaleCode>,
        seo_enabled: bool,
    ) -> Self {
        let mut active: Vec<LocaleCode> = Vec::with_capacity(active_locales.len());
        for code in active_locales {
            if code != default_locale && !active.contains(&code) {
                active.push(code);
            }
        }
        Self {
            provider,
            default_locale,
            active_locales: active,
            seo_enabled,
        }
    }

    /// Whether `code` is an enabled non-default locale.
    pub fn is_active(&self, code: &LocaleCode) -> bool {
        self.active_locales.contains(code)
    }

    pub fn is_default(&self, code: &LocaleCode) -> bool {
        *code == self.default_locale
    }

    /// Default locale first, then the active ones.
    pub fn all_locales(&self) -> Vec<LocaleCode> {
        std::iter::once(self.default_locale.clone())
            .chain(self.active_locales.iter().cloned())
            .collect()
    }

    /// Sanitize raw settings input.
    ///
    /// Unknown providers fall back to Google, an invalid default keeps
    /// `current`'s default, and invalid locale codes are dropped. Every
    /// correction is reported as a warning rather than an error.
    pub fn sanitize(input: &SettingsInput, current: &Settings) -> SanitizedSettings {
        let mut warnings = Vec::new();

        let provider = match input.provider.as_deref() {
            None => current.provider,
            Some(raw) => ProviderId::parse(raw).unwrap_or_else(|| {
                warnings.push(format!("Unknown provider '{}', using Google", raw));
                ProviderId::Google
            }),
        };

        let default_locale = match input.default_locale.as_deref() {
            None => current.default_locale.clone(),
            Some(raw) => LocaleCode::parse(raw).unwrap_or_else(|_| {
                warnings.push(format!(
                    "Invalid default locale '{}', keeping '{}'",
                    raw, current.default_locale
                ));
                current.default_locale.clone()
            }),
        };

        let active_locales = match &input.active_locales {
            None => current.active_locales.clone(),
            Some(raw_list) => raw_list
                .iter()
                .filter_map(|raw| match LocaleCode::parse(raw) {
                    Ok(code) => Some(code),
                    Err(_) => {
                        warnings.push(format!("Ignored invalid locale '{}'", raw));
                        None
                    }
                })
                .collect(),
        };

        SanitizedSettings {
            settings: Settings::new(
                provider,
                default_locale,
                active_locales,
                input.seo_enabled.unwrap_or(current.seo_enabled),
            ),
            google_key: input.google_key.as_deref().and_then(sanitize_key),
            deepl_key: input.deepl_key.as_deref().and_then(sanitize_key),
            warnings,
        }
    }
}

/// Raw settings as submitted by the settings UI. Absent fields keep their
/// current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsInput {
    pub provider: Option<String>,
    pub default_locale: Option<String>,
    pub active_locales: Option<Vec<String>>,
    pub seo_enabled: Option<bool>,
    pub google_key: Option<String>,
    pub deepl_key: Option<String>,
}

/// Output of [`Settings::sanitize`].
#[derive(Debug, Clone)]
pub struct SanitizedSettings {
    pub settings: Settings,
    pub google_key: Option<String>,
    pub deepl_key: Option<String>,
    pub warnings: Vec<String>,
}

/// Treat a key as an opaque string: trim it and strip control characters.
fn sanitize_key(raw: &str) -> Option<String> {
    let key: String = raw.trim().chars().filter(|c| !c.is_control()).collect();
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}
