use anyhow::Result;
use polyglot_gateway::{
    cache::SqliteCache,
    config::Config,
    pipeline::RequestPipeline,
    provider::ProviderGateway,
    rewrite::{RewriteRules, UrlRewriter},
    secrets::MemorySecretStore,
    server::{self, AppState},
    translator::TranslationService,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("polyglot_gateway=info".parse()?),
        )
        .init();

    info!("Starting translation gateway");

    let config = Config::from_env()?;
    let settings = config.settings();

    info!(
        "Provider: {}, default locale: {}, active locales: {:?}",
        settings.provider,
        settings.default_locale,
        settings.active_locales.iter().map(|c| c.as_str()).collect::<Vec<_>>()
    );

    let cache = SqliteCache::connect(&config.database_url).await?;
    let purged = cache.purge_expired().await?;
    if purged > 0 {
        info!("Purged {} expired cache entries", purged);
    }

    let gateway = ProviderGateway::new(
        config.endpoints.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?;

    let secrets = MemorySecretStore::from_keys(
        config.google_api_key.clone(),
        config.deepl_api_key.clone(),
    );

    let service = Arc::new(TranslationService::new(
        settings,
        Arc::new(secrets),
        Arc::new(cache),
        gateway,
    ));

    for issue in service.diagnostics().await {
        warn!("Configuration: {}", issue);
    }

    let rules = match &config.rewrite_rules_path {
        Some(path) => RewriteRules::load(path)?,
        None => RewriteRules::default(),
    };
    let rewriter = UrlRewriter::new(config.site_url.clone()).with_rules(rules);

    if config.admin_token.is_none() {
        warn!("ADMIN_TOKEN not set, admin endpoints are disabled");
    }

    let state = Arc::new(AppState {
        pipeline: RequestPipeline::new(service, rewriter),
        admin_token: config.admin_token.clone(),
    });

    server::serve(state, config.port).await
}
