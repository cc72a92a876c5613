//! Determine the active locale for one inbound request.
//!
//! Precedence is path prefix, then `lang` query parameter, then the default
//! locale. Only the highest-precedence candidate present is considered: an
//! inactive path prefix resolves to the default even when `lang` names an
//! active locale.

use super::LocaleCode;
use crate::config::Settings;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::debug;

/// Query parameter carrying the locale when SEO paths are disabled.
pub const LANG_PARAM: &str = "lang";

/// Matches a leading two-letter path segment: `/fr`, `/fr/`, `/fr/about`.
fn locale_route_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^/?([a-z]{2})(/.*)?$").expect("Invalid locale route regex"))
}

/// A path split into its leading locale segment and the remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleRoute<'a> {
    pub segment: &'a str,
    /// Remainder of the path, always starting with `/`.
    pub rest: &'a str,
}

/// Split `path` when its first segment is exactly two lower-case letters.
///
/// The segment is returned whether or not it names an enabled locale.
pub fn match_locale_route(path: &str) -> Option<LocaleRoute<'_>> {
    let caps = locale_route_regex().captures(path)?;
    let segment = caps.get(1)?.as_str();
    let rest = caps.get(2).map(|m| m.as_str()).unwrap_or("/");
    Some(LocaleRoute { segment, rest })
}

/// The parts of an HTTP request the resolver looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundRequest {
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    /// Administrative or backend request; never localized.
    pub internal: bool,
}

impl InboundRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: None,
            internal: false,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        let query = query.trim_start_matches('?');
        self.query = (!query.is_empty()).then(|| query.to_string());
        self
    }

    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn route(&self) -> Option<LocaleRoute<'_>> {
        match_locale_route(&self.path)
    }

    /// First value of query parameter `name`, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// The query string with every `name` parameter removed, or `None` if
    /// nothing is left.
    pub fn query_without(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        let remaining: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
            .filter(|(key, _)| key != name)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if remaining.is_empty() {
            return None;
        }
        Some(
            url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(remaining)
                .finish(),
        )
    }
}

/// Where the resolved locale came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocaleSource {
    Path,
    Query,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLocale {
    pub locale: LocaleCode,
    pub source: LocaleSource,
}

/// Resolves requests against one settings snapshot.
#[derive(Debug, Clone)]
pub struct LocaleResolver<'a> {
    settings: &'a Settings,
}

impl<'a> LocaleResolver<'a> {
    pub fn from_settings(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub fn resolve(&self, request: &InboundRequest) -> ResolvedLocale {
        if request.internal {
            return self.default_locale();
        }

        if let Some(route) = request.route() {
            return self.accept(route.segment, LocaleSource::Path);
        }

        if let Some(lang) = request.query_param(LANG_PARAM) {
            return self.accept(&lang, LocaleSource::Query);
        }

        self.default_locale()
    }

    fn accept(&self, candidate: &str, source: LocaleSource) -> ResolvedLocale {
        match LocaleCode::parse(candidate) {
            Ok(code) if self.settings.is_active(&code) => ResolvedLocale {
                locale: code,
                source,
            },
            _ => {
                debug!(
                    "Locale candidate '{}' from {:?} is not active, using default '{}'",
                    candidate, source, self.settings.default_locale
                );
                self.default_locale()
            }
        }
    }

    fn default_locale(&self) -> ResolvedLocale {
        ResolvedLocale {
            locale: self.settings.default_locale.clone(),
            source: LocaleSource::Default,
        }
    }
}
