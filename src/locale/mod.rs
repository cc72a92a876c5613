//! Locale identifiers, the static locale table, and per-request resolution.

mod code;
mod registry;
mod resolver;

pub use code::LocaleCode;
pub use registry::{LocaleInfo, LocaleRegistry, FALLBACK_FLAG};
pub use resolver::{
    match_locale_route, InboundRequest, LANG_PARAM, LocaleResolver, LocaleRoute, LocaleSource, ResolvedLocale,
};
