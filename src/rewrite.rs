//! Locale-aware URL rewriting.
//!
//! Outbound: prefix links and home URLs with the active locale (`/about` ->
//! `/fr/about`), or append `?lang=fr` when SEO paths are off. Inbound: turn
//! `?lang=fr` requests into a permanent redirect to the prefixed path.

use crate::config::Settings;
use crate::locale::{match_locale_route, InboundRequest, LocaleCode, LocaleRegistry, LANG_PARAM};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

pub const REDIRECT_STATUS: u16 = 301;

/// Split `path` into the path proper and its `?query#fragment` suffix.
fn split_suffix(path: &str) -> (&str, &str) {
    match path.find(['?', '#']) {
        Some(idx) => path.split_at(idx),
        None => (path, ""),
    }
}

/// `base_url` with the active locale and `path` appended.
///
/// Unchanged (`base_url` + `path`) for the default locale.
pub fn rewrite_outbound_url(
    base_url: &str,
    path: &str,
    active: &LocaleCode,
    default: &LocaleCode,
) -> String {
    let base = base_url.trim_end_matches('/');
    if active == default {
        return format!("{}{}", base, path);
    }
    format!("{}/{}{}", base, active, path)
}

/// Prefix a root-relative path with the active locale.
///
/// Already-prefixed paths, the default locale and anything that is not a
/// root-relative path (absolute URLs, `//cdn`, `#top`) are returned unchanged.
pub fn rewrite_link(path: &str, active: &LocaleCode, default: &LocaleCode) -> String {
    if active == default || !is_root_relative(path) {
        return path.to_string();
    }

    let (bare, _) = split_suffix(path);
    if match_locale_route(bare).is_some_and(|route| route.segment == active.as_str()) {
        return path.to_string();
    }

    format!("/{}{}", active, path)
}

/// Query-parameter form of [`rewrite_link`]: `/about` -> `/about?lang=fr`.
pub fn rewrite_link_with_query(path: &str, active: &LocaleCode, default: &LocaleCode) -> String {
    if active == default || !is_root_relative(path) {
        return path.to_string();
    }

    let (before_fragment, fragment) = match path.find('#') {
        Some(idx) => path.split_at(idx),
        None => (path, ""),
    };
    let (bare, query) = match before_fragment.split_once('?') {
        Some((bare, query)) => (bare, Some(query)),
        None => (before_fragment, None),
    };

    let already_tagged = query.is_some_and(|q| {
        url::form_urlencoded::parse(q.as_bytes()).any(|(key, _)| key == LANG_PARAM)
    });
    if already_tagged {
        return path.to_string();
    }

    match query.filter(|q| !q.is_empty()) {
        Some(query) => format!("{}?{}&{}={}{}", bare, query, LANG_PARAM, active, fragment),
        None => format!("{}?{}={}{}", bare, LANG_PARAM, active, fragment),
    }
}

fn is_root_relative(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//")
}

/// A permanent redirect to the canonical locale-prefixed URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectDirective {
    pub location: String,
    pub status: u16,
}

/// A fixed translated slug for one locale, e.g. `about` -> `a-propos` in `fr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    pub original_slug: String,
    pub translated_slug: String,
    pub locale: LocaleCode,
}

/// Static slug table applied per path segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewriteRules {
    rules: Vec<RewriteRule>,
}

impl RewriteRules {
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self { rules }
    }

    /// Load rules from a JSON array of `{original_slug, translated_slug, locale}`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rewrite rules from {}", path.display()))?;
        let rules: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid rewrite rules in {}", path.display()))?;
        info!("Loaded {} slug rewrite rules", rules.len());
        Ok(rules)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Outbound: replace original slugs with their `locale` translation.
    pub fn translate_slug(&self, path: &str, locale: &LocaleCode) -> String {
        self.map_segments(path, |segment| {
            self.rules
                .iter()
                .find(|r| r.locale == *locale && r.original_slug == segment)
                .map(|r| r.translated_slug.as_str())
        })
    }

    /// Inbound: map translated slugs back to the originals.
    pub fn original_slug(&self, path: &str, locale: &LocaleCode) -> String {
        self.map_segments(path, |segment| {
            self.rules
                .iter()
                .find(|r| r.locale == *locale && r.translated_slug == segment)
                .map(|r| r.original_slug.as_str())
        })
    }

    fn map_segments<'a, F>(&'a self, path: &str, lookup: F) -> String
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        if self.rules.is_empty() {
            return path.to_string();
        }
        let (bare, suffix) = split_suffix(path);
        let mapped: Vec<&str> = bare
            .split('/')
            .map(|segment| lookup(segment).unwrap_or(segment))
            .collect();
        format!("{}{}", mapped.join("/"), suffix)
    }
}

/// One entry of the language switcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitcherLink {
    pub code: LocaleCode,
    /// Upper-case code, e.g. "FR".
    pub label: String,
    pub flag: &'static str,
    pub url: String,
    pub active: bool,
}

/// URL rewriting bound to one site root.
#[derive(Debug, Clone)]
pub struct UrlRewriter {
    site_url: String,
    rules: RewriteRules,
}

impl UrlRewriter {
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into().trim_end_matches('/').to_string(),
            rules: RewriteRules::default(),
        }
    }

    pub fn with_rules(mut self, rules: RewriteRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    pub fn rules(&self) -> &RewriteRules {
        &self.rules
    }

    /// Site home for `active`: `https://site/fr/path` style, or `?lang=` style
    /// when SEO paths are off.
    pub fn home_url(&self, path: &str, active: &LocaleCode, settings: &Settings) -> String {
        if settings.seo_enabled {
            rewrite_outbound_url(&self.site_url, path, active, &settings.default_locale)
        } else {
            let path = if path.is_empty() { "/" } else { path };
            format!(
                "{}{}",
                self.site_url,
                rewrite_link_with_query(path, active, &settings.default_locale)
            )
        }
    }

    /// Rewrite a root-relative link for `active`, applying slug rules first.
    pub fn link(&self, path: &str, active: &LocaleCode, settings: &Settings) -> String {
        if settings.is_default(active) || !is_root_relative(path) {
            return path.to_string();
        }
        let translated = self.rules.translate_slug(path, active);
        if settings.seo_enabled {
            rewrite_link(&translated, active, &settings.default_locale)
        } else {
            rewrite_link_with_query(&translated, active, &settings.default_locale)
        }
    }

    /// Rewrite a full permalink on this site. Foreign URLs are unchanged.
    pub fn rewrite_permalink(&self, permalink: &str, active: &LocaleCode, settings: &Settings) -> String {
        if settings.is_default(active) {
            return permalink.to_string();
        }
        let Some(rest) = permalink.strip_prefix(&self.site_url) else {
            return permalink.to_string();
        };
        // "https://site.example" must not match "https://site.example.evil"
        if !(rest.is_empty() || rest.starts_with(['/', '?', '#'])) {
            return permalink.to_string();
        }
        let rest = if rest.starts_with('/') {
            rest.to_string()
        } else {
            format!("/{}", rest)
        };
        format!("{}{}", self.site_url, self.link(&rest, active, settings))
    }

    /// Redirect `?lang=xx` requests to `/xx/...` when `xx` is active.
    ///
    /// Returns `None` for internal requests, requests whose path already
    /// carries a locale segment, inactive or malformed `lang` values, and
    /// whenever SEO paths are disabled.
    pub fn normalize_inbound_redirect(
        &self,
        request: &InboundRequest,
        settings: &Settings,
    ) -> Option<RedirectDirective> {
        if !settings.seo_enabled || request.internal || request.route().is_some() {
            return None;
        }

        let raw = request.query_param(LANG_PARAM)?;
        let locale = LocaleCode::parse(&raw).ok()?;
        if !settings.is_active(&locale) {
            debug!("Ignoring redirect to inactive locale '{}'", raw);
            return None;
        }

        let path = if request.path.starts_with('/') {
            request.path.clone()
        } else {
            format!("/{}", request.path)
        };
        let mut location = format!("{}/{}{}", self.site_url, locale, path);
        if let Some(query) = request.query_without(LANG_PARAM) {
            location.push('?');
            location.push_str(&query);
        }

        Some(RedirectDirective {
            location,
            status: REDIRECT_STATUS,
        })
    }

    /// Switcher entries: default locale first, then the active ones.
    pub fn switcher_links(&self, current: &LocaleCode, settings: &Settings) -> Vec<SwitcherLink> {
        let registry = LocaleRegistry::get();
        settings
            .all_locales()
            .into_iter()
            .map(|code| {
                let url = if settings.is_default(&code) {
                    self.site_url.clone()
                } else if settings.seo_enabled {
                    format!("{}/{}/", self.site_url, code)
                } else {
                    format!("{}/?{}={}", self.site_url, LANG_PARAM, code)
                };
                SwitcherLink {
                    label: code.as_str().to_uppercase(),
                    flag: registry.flag_for(code.as_str()),
                    active: code == *current,
                    url,
                    code,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderId;
    use proptest::prelude::*;

    fn code(raw: &str) -> LocaleCode {
        LocaleCode::parse(raw).unwrap()
    }

    /// Default "es", active {en, fr}.
    fn settings() -> Settings {
        Settings::new(ProviderId::Google, code("es"), vec![code("en"), code("fr")], true)
    }

    fn rewriter() -> UrlRewriter {
        UrlRewriter::new("https://site.example/")
    }

    fn rule(original: &str, translated: &str, locale: &str) -> RewriteRule {
        RewriteRule {
            original_slug: original.to_string(),
            translated_slug: translated.to_string(),
            locale: code(locale),
        }
    }

    // ==================== rewrite_link Tests ====================

    #[test]
    fn test_rewrite_link_prefixes_active() {
        assert_eq!(rewrite_link("/about", &code("fr"), &code("es")), "/fr/about");
        assert_eq!(rewrite_link("/", &code("fr"), &code("es")), "/fr/");
        assert_eq!(rewrite_link("/blog?page=2#c", &code("fr"), &code("es")), "/fr/blog?page=2#c");
    }

    #[test]
    fn test_rewrite_link_default_unchanged() {
        assert_eq!(rewrite_link("/about", &code("es"), &code("es")), "/about");
    }

    #[test]
    fn test_rewrite_link_idempotent() {
        let once = rewrite_link("/about", &code("fr"), &code("es"));
        assert_eq!(rewrite_link(&once, &code("fr"), &code("es")), once);
        assert_eq!(rewrite_link("/fr", &code("fr"), &code("es")), "/fr");
    }

    #[test]
    fn test_rewrite_link_similar_prefix_is_not_locale() {
        assert_eq!(rewrite_link("/france", &code("fr"), &code("es")), "/fr/france");
    }

    #[test]
    fn test_rewrite_link_ignores_non_paths() {
        for link in ["https://other.example/x", "//cdn.example/x.js", "#top", "mailto:a@b.c"] {
            assert_eq!(rewrite_link(link, &code("fr"), &code("es")), link);
        }
    }

    #[test]
    fn test_rewrite_link_with_query() {
        let (fr, es) = (code("fr"), code("es"));
        assert_eq!(rewrite_link_with_query("/about", &fr, &es), "/about?lang=fr");
        assert_eq!(rewrite_link_with_query("/a?x=1#f", &fr, &es), "/a?x=1&lang=fr#f");
        assert_eq!(rewrite_link_with_query("/a?lang=fr", &fr, &es), "/a?lang=fr");
        assert_eq!(rewrite_link_with_query("/a", &es, &es), "/a");
    }

    proptest! {
        #[test]
        fn prop_rewrite_link_idempotent(path in "/[a-z0-9_-]{1,12}(/[a-z0-9_-]{1,12}){0,3}/?") {
            let (fr, es) = (code("fr"), code("es"));
            let once = rewrite_link(&path, &fr, &es);
            prop_assert_eq!(rewrite_link(&once, &fr, &es), once.clone());
            prop_assert!(once.starts_with("/fr"));
        }
    }

    // ==================== rewrite_outbound_url Tests ====================

    #[test]
    fn test_rewrite_outbound_url() {
        assert_eq!(
            rewrite_outbound_url("https://site.example/", "/about", &code("fr"), &code("es")),
            "https://site.example/fr/about"
        );
        assert_eq!(
            rewrite_outbound_url("https://site.example", "", &code("fr"), &code("es")),
            "https://site.example/fr"
        );
        assert_eq!(
            rewrite_outbound_url("https://site.example/", "/about", &code("es"), &code("es")),
            "https://site.example/about"
        );
    }

    #[test]
    fn test_home_url_query_style() {
        let settings = Settings {
            seo_enabled: false,
            ..settings()
        };
        assert_eq!(
            rewriter().home_url("", &code("fr"), &settings),
            "https://site.example/?lang=fr"
        );
    }

    // ==================== Permalink Tests ====================

    #[test]
    fn test_rewrite_permalink() {
        let r = rewriter();
        let s = settings();
        assert_eq!(
            r.rewrite_permalink("https://site.example/2024/hello/", &code("fr"), &s),
            "https://site.example/fr/2024/hello/"
        );
        assert_eq!(
            r.rewrite_permalink("https://site.example", &code("fr"), &s),
            "https://site.example/fr/"
        );
        assert_eq!(
            r.rewrite_permalink("https://site.example/x", &code("es"), &s),
            "https://site.example/x"
        );
    }

    #[test]
    fn test_rewrite_permalink_foreign_unchanged() {
        let r = rewriter();
        let s = settings();
        for url in ["https://other.example/x", "https://site.example.evil/x"] {
            assert_eq!(r.rewrite_permalink(url, &code("fr"), &s), url);
        }
    }

    #[test]
    fn test_link_applies_slug_rules() {
        let r = rewriter().with_rules(RewriteRules::new(vec![rule("about", "a-propos", "fr")]));
        let s = settings();
        assert_eq!(r.link("/about/team", &code("fr"), &s), "/fr/a-propos/team");
        assert_eq!(r.link("/about", &code("en"), &s), "/en/about");
        assert_eq!(r.link("/about", &code("es"), &s), "/about");
    }

    // ==================== Redirect Tests ====================

    #[test]
    fn test_redirect_strips_lang() {
        let request = InboundRequest::new("/about").with_query("lang=fr&page=2");
        let directive = rewriter()
            .normalize_inbound_redirect(&request, &settings())
            .unwrap();
        assert_eq!(directive.location, "https://site.example/fr/about?page=2");
        assert_eq!(directive.status, 301);
    }

    #[test]
    fn test_redirect_without_other_params() {
        let request = InboundRequest::new("/").with_query("lang=en");
        let directive = rewriter()
            .normalize_inbound_redirect(&request, &settings())
            .unwrap();
        assert_eq!(directive.location, "https://site.example/en/");
    }

    #[test]
    fn test_no_redirect_cases() {
        let r = rewriter();
        let s = settings();
        let cases = [
            InboundRequest::new("/about"),
            InboundRequest::new("/about").with_query("lang=de"),
            InboundRequest::new("/about").with_query("lang=es"),
            InboundRequest::new("/about").with_query("lang=https://evil.example"),
            InboundRequest::new("/fr/about").with_query("lang=en"),
            InboundRequest::new("/about").with_query("lang=fr").internal(),
        ];
        for request in cases {
            assert!(r.normalize_inbound_redirect(&request, &s).is_none(), "{:?}", request);
        }
    }

    #[test]
    fn test_no_redirect_when_seo_disabled() {
        let settings = Settings {
            seo_enabled: false,
            ..settings()
        };
        let request = InboundRequest::new("/about").with_query("lang=fr");
        assert!(rewriter().normalize_inbound_redirect(&request, &settings).is_none());
    }

    // ==================== RewriteRules Tests ====================

    #[test]
    fn test_slug_rules_roundtrip_per_locale() {
        let rules = RewriteRules::new(vec![
            rule("about", "a-propos", "fr"),
            rule("about", "acerca", "es"),
        ]);
        assert_eq!(rules.translate_slug("/about?x=1", &code("fr")), "/a-propos?x=1");
        assert_eq!(rules.original_slug("/a-propos", &code("fr")), "/about");
        assert_eq!(rules.original_slug("/a-propos", &code("es")), "/a-propos");
        assert_eq!(rules.translate_slug("/about-us", &code("fr")), "/about-us");
    }

    #[test]
    fn test_rules_load_from_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("rules.json");
        std::fs::write(
            &file,
            r#"[{"original_slug": "contact", "translated_slug": "kontakt", "locale": "de"}]"#,
        )
        .unwrap();

        let rules = RewriteRules::load(&file).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules.translate_slug("/contact", &code("de")), "/kontakt");
    }

    #[test]
    fn test_rules_load_rejects_bad_locale() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("rules.json");
        std::fs::write(
            &file,
            r#"[{"original_slug": "a", "translated_slug": "b", "locale": "german"}]"#,
        )
        .unwrap();

        assert!(RewriteRules::load(&file).is_err());
    }

    // ==================== Switcher Tests ====================

    #[test]
    fn test_switcher_links() {
        let links = rewriter().switcher_links(&code("fr"), &settings());

        let codes: Vec<&str> = links.iter().map(|l| l.code.as_str()).collect();
        assert_eq!(codes, vec!["es", "en", "fr"]);

        assert_eq!(links[0].url, "https://site.example");
        assert_eq!(links[2].url, "https://site.example/fr/");
        assert_eq!(links[2].label, "FR");
        assert!(links[2].active);
        assert!(!links[0].active);
        assert_eq!(links[0].flag, LocaleRegistry::get().flag_for("es"));
    }

    #[test]
    fn test_switcher_links_query_style() {
        let settings = Settings {
            seo_enabled: false,
            ..settings()
        };
        let links = rewriter().switcher_links(&code("es"), &settings);
        assert_eq!(links[1].url, "https://site.example/?lang=en");
    }
}
