//! Per-request stage order: settings snapshot, locale resolution, redirect
//! check, then localization and link rewriting through the resulting scope.

use crate::config::Settings;
use crate::locale::{InboundRequest, LocaleCode, LocaleResolver, LocaleSource, ResolvedLocale};
use crate::rewrite::{RedirectDirective, SwitcherLink, UrlRewriter};
use crate::security::Viewer;
use crate::translator::TranslationService;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct RequestPipeline {
    service: Arc<TranslationService>,
    rewriter: Arc<UrlRewriter>,
}

impl RequestPipeline {
    pub fn new(service: Arc<TranslationService>, rewriter: UrlRewriter) -> Self {
        Self {
            service,
            rewriter: Arc::new(rewriter),
        }
    }

    pub fn service(&self) -> &Arc<TranslationService> {
        &self.service
    }

    pub fn rewriter(&self) -> &UrlRewriter {
        &self.rewriter
    }

    /// Run the resolution stages for `request`.
    pub async fn begin(&self, request: &InboundRequest, viewer: Viewer) -> RequestScope<'_> {
        let settings = self.service.settings().await;
        let resolved = LocaleResolver::from_settings(&settings).resolve(request);
        let redirect = self.rewriter.normalize_inbound_redirect(request, &settings);

        let content_path = match request.route() {
            Some(route) if resolved.source == LocaleSource::Path => self
                .rewriter
                .rules()
                .original_slug(route.rest, &resolved.locale),
            _ => request.path.clone(),
        };

        debug!(
            "Resolved {} to locale {} ({:?})",
            request.path, resolved.locale, resolved.source
        );

        RequestScope {
            pipeline: self,
            settings,
            resolved,
            redirect,
            viewer,
            content_path,
        }
    }
}

/// The resolved state of one request. Only obtainable from
/// [`RequestPipeline::begin`].
pub struct RequestScope<'p> {
    pipeline: &'p RequestPipeline,
    settings: Settings,
    resolved: ResolvedLocale,
    redirect: Option<RedirectDirective>,
    viewer: Viewer,
    content_path: String,
}

impl RequestScope<'_> {
    pub fn locale(&self) -> &LocaleCode {
        &self.resolved.locale
    }

    pub fn source(&self) -> LocaleSource {
        self.resolved.source
    }

    pub fn resolved(&self) -> &ResolvedLocale {
        &self.resolved
    }

    /// Redirect the caller should issue instead of rendering, if any.
    pub fn redirect(&self) -> Option<&RedirectDirective> {
        self.redirect.as_ref()
    }

    pub fn viewer(&self) -> Viewer {
        self.viewer
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Path to render content for: the locale prefix removed and translated
    /// slugs mapped back to their originals.
    pub fn content_path(&self) -> &str {
        &self.content_path
    }

    pub async fn localize(&self, text: &str) -> String {
        self.pipeline
            .service
            .localize_with(&self.settings, text, &self.resolved.locale, self.viewer)
            .await
    }

    pub async fn localize_title(&self, title: &str) -> String {
        if title.trim().is_empty() {
            return title.to_string();
        }
        self.localize(title).await
    }

    pub fn rewrite_link(&self, path: &str) -> String {
        self.pipeline
            .rewriter
            .link(path, &self.resolved.locale, &self.settings)
    }

    pub fn rewrite_permalink(&self, permalink: &str) -> String {
        self.pipeline
            .rewriter
            .rewrite_permalink(permalink, &self.resolved.locale, &self.settings)
    }

    pub fn home_url(&self, path: &str) -> String {
        self.pipeline
            .rewriter
            .home_url(path, &self.resolved.locale, &self.settings)
    }

    pub fn switcher_links(&self) -> Vec<SwitcherLink> {
        self.pipeline
            .rewriter
            .switcher_links(&self.resolved.locale, &self.settings)
    }
}
