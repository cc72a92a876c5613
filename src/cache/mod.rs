//! Translation cache: fingerprints, the storage trait, and two stores.
//!
//! Keys are `pg_tr_` followed by a full SHA-256 digest of the source text,
//! target locale and provider. The namespace prefix lets `invalidate_all`
//! drop every translation without touching unrelated entries that share the
//! same backing store.

mod memory;
mod sqlite;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

use crate::locale::LocaleCode;
use crate::provider::ProviderId;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;
use std::time::Duration;

/// Prefix carried by every translation cache key.
pub const CACHE_NAMESPACE: &str = "pg_tr_";

/// Fixed retention window for cached translations.
pub const CACHE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Start of the inline diagnostic appended for privileged viewers.
pub const FAILURE_MARKER: &str = "<!-- PolyGlot Error";

/// The inputs that identify one translation.
#[derive(Debug, Clone, Copy)]
pub struct TranslationRequest<'a> {
    pub source_text: &'a str,
    pub target_locale: &'a LocaleCode,
    pub provider: ProviderId,
}

impl TranslationRequest<'_> {
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }
}

/// Namespaced cache key for a [`TranslationRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash the full request. Each field is length-prefixed so that no two
    /// distinct requests can produce the same byte stream.
    pub fn of(request: &TranslationRequest<'_>) -> Self {
        let mut hasher = Sha256::new();
        for field in [
            request.source_text,
            request.target_locale.as_str(),
            request.provider.as_str(),
        ] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        Self(format!("{}{:x}", CACHE_NAMESPACE, hasher.finalize()))
    }

    /// The full storage key, including the namespace prefix.
    pub fn as_key(&self) -> &str {
        &self.0
    }

    /// The hex digest without the namespace prefix.
    pub fn digest(&self) -> &str {
        &self.0[CACHE_NAMESPACE.len()..]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a provider result is worth storing.
///
/// Results identical to the source are not cached (the provider may simply
/// have echoed the input) and neither is anything carrying a failure marker.
pub fn should_cache(source: &str, candidate: &str) -> bool {
    !candidate.is_empty() && candidate != source && !candidate.contains(FAILURE_MARKER)
}

/// A stored translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(value: impl Into<String>, ttl: Duration) -> Self {
        let created_at = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        Self {
            value: value.into(),
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Storage for translations, shared by all in-flight requests.
///
/// Implementations must be safe under concurrent access. Two requests
/// racing on the same miss may both write; the values are identical.
#[async_trait]
pub trait TranslationCache: Send + Sync {
    /// Cached value for `fingerprint`, or `None` when absent or expired.
    async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<String>>;

    /// Store `value` under `fingerprint`, replacing any previous value.
    async fn put(&self, fingerprint: &Fingerprint, value: &str, ttl: Duration) -> Result<()>;

    /// Remove every translation entry. Returns the number removed.
    async fn invalidate_all(&self) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request<'a>(text: &'a str, locale: &'a LocaleCode) -> TranslationRequest<'a> {
        TranslationRequest {
            source_text: text,
            target_locale: locale,
            provider: ProviderId::Google,
        }
    }

    // ==================== Fingerprint Tests ====================

    #[test]
    fn test_fingerprint_is_namespaced_full_sha256() {
        let fr = LocaleCode::parse("fr").unwrap();
        let fp = request("Hello", &fr).fingerprint();
        assert!(fp.as_key().starts_with(CACHE_NAMESPACE));
        assert_eq!(fp.digest().len(), 64);
        assert!(fp.digest().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let fr = LocaleCode::parse("fr").unwrap();
        assert_eq!(
            request("Hello world", &fr).fingerprint(),
            request("Hello world", &fr).fingerprint()
        );
    }

    #[test]
    fn test_fingerprint_same_length_shared_prefix_differs() {
        let fr = LocaleCode::parse("fr").unwrap();
        let prefix = "Lorem ipsum dolor sit amet ".repeat(20);
        let t1 = format!("{}A", prefix);
        let t2 = format!("{}B", prefix);
        assert_eq!(t1.len(), t2.len());
        assert_ne!(request(&t1, &fr).fingerprint(), request(&t2, &fr).fingerprint());
    }

    #[test]
    fn test_fingerprint_differs_by_locale_and_provider() {
        let fr = LocaleCode::parse("fr").unwrap();
        let de = LocaleCode::parse("de").unwrap();
        let google = request("Hello", &fr);
        let deepl = TranslationRequest {
            provider: ProviderId::Deepl,
            ..google
        };
        assert_ne!(google.fingerprint(), request("Hello", &de).fingerprint());
        assert_ne!(google.fingerprint(), deepl.fingerprint());
    }

    proptest! {
        #[test]
        fn prop_distinct_texts_have_distinct_fingerprints(a in ".{0,64}", b in ".{0,64}") {
            prop_assume!(a != b);
            let fr = LocaleCode::parse("fr").unwrap();
            prop_assert_ne!(request(&a, &fr).fingerprint(), request(&b, &fr).fingerprint());
        }
    }

    // ==================== should_cache Tests ====================

    #[test]
    fn test_should_cache_real_translation() {
        assert!(should_cache("Hello", "Bonjour"));
    }

    #[test]
    fn test_should_not_cache_echo() {
        assert!(!should_cache("Hello", "Hello"));
    }

    #[test]
    fn test_should_not_cache_failure_marker() {
        assert!(!should_cache(
            "Hello",
            "Hello <!-- PolyGlot Error: Transport: timed out -->"
        ));
    }

    #[test]
    fn test_should_not_cache_empty() {
        assert!(!should_cache("Hello", ""));
    }

    // ==================== CacheEntry Tests ====================

    #[test]
    fn test_entry_expiry() {
        let entry = CacheEntry::new("Bonjour", CACHE_TTL);
        assert!(!entry.is_expired_at(Utc::now()));
        assert!(entry.is_expired_at(entry.created_at + chrono::Duration::days(30)));
    }

    #[test]
    fn test_zero_ttl_is_immediately_expired() {
        let entry = CacheEntry::new("Bonjour", Duration::ZERO);
        assert!(entry.is_expired_at(entry.created_at));
    }
}
