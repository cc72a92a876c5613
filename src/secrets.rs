//! Provider API key storage.
//!
//! The translation core only ever sees decrypted keys through [`SecretStore`];
//! how they are held at rest is up to the implementation.

use crate::provider::ProviderId;
use std::collections::HashMap;
use std::sync::RwLock;

pub trait SecretStore: Send + Sync {
    /// Decrypted key for `provider`, or `None` if none is configured.
    fn get(&self, provider: ProviderId) -> Option<String>;

    /// Replace (or with `None`, remove) the key for `provider`.
    fn set(&self, provider: ProviderId, key: Option<String>);
}

/// Keys held in process memory only.
#[derive(Default)]
pub struct MemorySecretStore {
    keys: RwLock<HashMap<ProviderId, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with the keys from the environment config.
    pub fn from_keys(google: Option<String>, deepl: Option<String>) -> Self {
        let store = Self::new();
        store.set(ProviderId::Google, google);
        store.set(ProviderId::Deepl, deepl);
        store
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, provider: ProviderId) -> Option<String> {
        self.keys
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&provider)
            .cloned()
    }

    fn set(&self, provider: ProviderId, key: Option<String>) {
        let mut keys = self
            .keys
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match key.filter(|k| !k.trim().is_empty()) {
            Some(key) => {
                keys.insert(provider, key);
            }
            None => {
                keys.remove(&provider);
            }
        }
    }
}
