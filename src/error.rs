//! Error types shared across the translation pipeline.
//!
//! None of these errors is fatal to a rendered page: the orchestrator and
//! the request pipeline always fall back to the original text or the default
//! locale. They exist so callers can log and (for privileged viewers)
//! annotate what went wrong.

use crate::provider::ProviderId;
use thiserror::Error;

/// Failure returned by a translation backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The active provider has no (or an empty) API key; no request was sent.
    #[error("No {0} API key configured")]
    NoKeyConfigured(ProviderId),

    /// DNS, connection, TLS or timeout failure.
    #[error("{0}")]
    Transport(String),

    /// Non-2xx status or a structured error payload from the provider.
    #[error("{0}")]
    ProviderRejected(String),
}

impl GatewayError {
    /// Short category label used in logs and inline diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            GatewayError::NoKeyConfigured(_) => "NoKeyConfigured",
            GatewayError::Transport(_) => "Transport",
            GatewayError::ProviderRejected(_) => "ProviderRejected",
        }
    }
}

/// A locale string that is not a two-letter code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocaleError {
    #[error("Invalid locale code: '{0}'")]
    Invalid(String),
}

/// Why a string could not be localized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocalizeError {
    /// The text carries executable markup and was never sent anywhere.
    #[error("Content blocked: executable markup detected")]
    ContentBlocked,

    /// The requested locale is not part of the active set.
    #[error("Locale '{0}' is not active")]
    LocaleInvalid(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
