//! Preview binary - translates one string with the configured provider
//!
//! Usage:
//!   cargo run --bin preview -- fr "Hello world"             # Translate through the SQLite cache
//!   cargo run --bin preview -- fr "Hello world" --no-cache  # Skip the durable cache
//!
//! Uses the same environment variables as the server (TRANSLATION_PROVIDER,
//! GOOGLE_API_KEY / DEEPL_API_KEY, DEFAULT_LOCALE, DATABASE_URL, ...).
//! The target locale does not need to be listed in ACTIVE_LOCALES.

use anyhow::{bail, Context, Result};
use polyglot_gateway::{
    cache::{MemoryCache, SqliteCache, TranslationCache},
    config::{Config, Settings},
    error::LocalizeError,
    locale::{LocaleCode, LocaleRegistry},
    provider::{deepl_target_code, ProviderGateway, ProviderId},
    secrets::MemorySecretStore,
    translator::TranslationService,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("polyglot_gateway=info".parse()?),
        )
        .init();

    // Parse CLI arguments
    let args: Vec<String> = std::env::args().skip(1).collect();
    let no_cache = args.iter().any(|arg| arg == "--no-cache");
    let positional: Vec<&String> = args.iter().filter(|arg| !arg.starts_with("--")).collect();

    let [locale, text] = positional.as_slice() else {
        bail!("Usage: preview <locale> <text> [--no-cache]");
    };
    let target = LocaleCode::parse(locale).context("Target locale must be a two-letter code")?;

    let config = Config::from_env()?;
    let base = config.settings();
    let mut active = base.active_locales.clone();
    active.push(target.clone());
    let settings = Settings::new(base.provider, base.default_locale.clone(), active, base.seo_enabled);

    let cache: Arc<dyn TranslationCache> = if no_cache {
        Arc::new(MemoryCache::new())
    } else {
        Arc::new(SqliteCache::connect(&config.database_url).await?)
    };

    let gateway = ProviderGateway::new(
        config.endpoints.clone(),
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let secrets = MemorySecretStore::from_keys(config.google_api_key.clone(), config.deepl_api_key.clone());
    let service = TranslationService::new(settings.clone(), Arc::new(secrets), cache, gateway);

    let language = LocaleRegistry::get()
        .get_by_code(target.as_str())
        .map(|info| info.name)
        .unwrap_or("unknown language");
    let provider_target = match settings.provider {
        ProviderId::Deepl => deepl_target_code(&target),
        ProviderId::Google => target.to_string(),
    };
    info!(
        "Translating to {} ({}) with {} as '{}'",
        language, target, settings.provider, provider_target
    );

    let result = service.try_localize(text, &target).await;
    let report = service.metrics();

    println!("\n========== TRANSLATION PREVIEW ==========");
    println!("Source:   {}", text);
    match &result {
        Ok(translated) => println!("Result:   {}", translated),
        Err(LocalizeError::Gateway(e)) => println!("Failed:   [{}] {}", e.category(), e),
        Err(e) => println!("Skipped:  {}", e),
    }
    if let Some(outcome) = report.cache_outcome() {
        println!("Cache:    {}", outcome);
    }
    println!("=========================================\n");

    Ok(())
}
