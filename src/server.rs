//! HTTP surface: the render pipeline for a content renderer, the language
//! switcher, and a token-protected admin API.

use crate::config::{Settings, SettingsInput};
use crate::locale::{InboundRequest, LocaleCode, LocaleSource, LANG_PARAM};
use crate::metrics::MetricsReport;
use crate::pipeline::RequestPipeline;
use crate::rewrite::{RedirectDirective, SwitcherLink};
use crate::security::{is_admin, viewer_from_authorization, Viewer};
use anyhow::{Context, Result};
use axum::{
    extract::{Json as ExtractJson, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub struct AppState {
    pub pipeline: RequestPipeline,
    pub admin_token: Option<String>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(serde_json::json!({
            "error": true,
            "message": message.into()
        })),
    )
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if is_admin(authorization(headers), state.admin_token.as_deref()) {
        Ok(())
    } else {
        warn!("Rejected unauthorized admin request");
        Err(api_error(StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextKind {
    #[default]
    Content,
    Title,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderText {
    #[serde(default)]
    pub kind: TextKind,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    pub path: String,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub texts: Vec<RenderText>,
    /// Root-relative paths or full permalinks.
    #[serde(default)]
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderResponse {
    pub locale: LocaleCode,
    pub source: LocaleSource,
    pub content_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<RedirectDirective>,
    pub texts: Vec<String>,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SwitcherQuery {
    pub path: Option<String>,
    pub lang: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SettingsView {
    pub settings: Settings,
    pub diagnostics: Vec<String>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/render", post(render))
        .route("/api/switcher", get(switcher))
        .route("/admin/settings", get(get_settings).put(put_settings))
        .route("/admin/cache/clear", post(clear_cache))
        .route("/admin/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `0.0.0.0:{port}` and serve until the process exits.
pub async fn serve(state: Arc<AppState>, port: u16) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;

    info!("Translation gateway listening on port {}", port);

    axum::serve(listener, router(state))
        .await
        .context("Server error")
}

async fn health() -> &'static str {
    "OK"
}

async fn render(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ExtractJson(request): ExtractJson<RenderRequest>,
) -> Json<RenderResponse> {
    let viewer = viewer_from_authorization(authorization(&headers), state.admin_token.as_deref());

    let mut inbound = InboundRequest::new(request.path);
    if let Some(query) = request.query {
        inbound = inbound.with_query(query);
    }
    if request.internal {
        inbound = inbound.internal();
    }

    let scope = state.pipeline.begin(&inbound, viewer).await;

    let mut response = RenderResponse {
        locale: scope.locale().clone(),
        source: scope.source(),
        content_path: scope.content_path().to_string(),
        redirect: scope.redirect().cloned(),
        texts: Vec::with_capacity(request.texts.len()),
        links: Vec::with_capacity(request.links.len()),
    };

    // The caller redirects instead of rendering.
    if response.redirect.is_some() {
        return Json(response);
    }

    for item in &request.texts {
        let rendered = match item.kind {
            TextKind::Content => scope.localize(&item.text).await,
            TextKind::Title => scope.localize_title(&item.text).await,
        };
        response.texts.push(rendered);
    }

    response.links = request
        .links
        .iter()
        .map(|link| {
            if link.starts_with('/') {
                scope.rewrite_link(link)
            } else {
                scope.rewrite_permalink(link)
            }
        })
        .collect();

    Json(response)
}

async fn switcher(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SwitcherQuery>,
) -> Json<Vec<SwitcherLink>> {
    let mut inbound = InboundRequest::new(params.path.unwrap_or_else(|| "/".to_string()));
    if let Some(lang) = params.lang {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair(LANG_PARAM, &lang)
            .finish();
        inbound = inbound.with_query(query);
    }

    let scope = state.pipeline.begin(&inbound, Viewer::Visitor).await;
    Json(scope.switcher_links())
}

async fn get_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SettingsView>, ApiError> {
    require_admin(&state, &headers)?;

    let service = state.pipeline.service();
    Ok(Json(SettingsView {
        settings: service.settings().await,
        diagnostics: service.diagnostics().await,
    }))
}

async fn put_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ExtractJson(input): ExtractJson<SettingsInput>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;

    match state.pipeline.service().save_settings(&input).await {
        Ok(outcome) => Ok(Json(serde_json::json!({
            "success": true,
            "settings": outcome.settings,
            "warnings": outcome.warnings,
            "invalidated": outcome.invalidated
        }))),
        Err(e) => {
            error!("Settings save failed: {:#}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Settings save failed: {}", e),
            ))
        }
    }
}

async fn clear_cache(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&state, &headers)?;

    match state.pipeline.service().clear_cache().await {
        Ok(deleted_count) => Ok(Json(serde_json::json!({
            "success": true,
            "deleted_count": deleted_count
        }))),
        Err(e) => {
            error!("Cache clear failed: {:#}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Cache clear failed: {}", e),
            ))
        }
    }
}

async fn metrics(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MetricsReport>, ApiError> {
    require_admin(&state, &headers)?;
    Ok(Json(state.pipeline.service().metrics()))
}
