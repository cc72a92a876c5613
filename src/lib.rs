pub mod cache;
pub mod config;
pub mod error;
pub mod locale;
pub mod metrics;
pub mod pipeline;
pub mod provider;
pub mod rewrite;
pub mod secrets;
pub mod security;
pub mod server;
pub mod translator;
