//! Provider registry for case-insensitive provider resolution.

use std::collections::HashMap;
use std::sync::Arc;

use super::ProviderConfig;
use crate::config::CredentialStore;
use crate::error::OAuthError;

/// Registry mapping normalized provider names to their configuration.
///
/// Read-only after construction, so any number of requests may resolve
/// concurrently through a shared reference.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<ProviderConfig>>,
}

impl ProviderRegistry {
    pub fn new(credentials: CredentialStore) -> Self {
        Self {
            providers: credentials.into_providers().collect(),
        }
    }

    /// Resolve a provider by name, ignoring ASCII case and surrounding whitespace.
    pub fn resolve(&self, provider_name: &str) -> Result<Arc<ProviderConfig>, OAuthError> {
        let key = normalize_name(provider_name);
        self.providers.get(&key).cloned().ok_or_else(|| {
            OAuthError::UnknownProvider(format!(
                "no credentials registered for '{}'",
                provider_name.trim()
            ))
        })
    }

    /// Check whether a provider is registered under the given name.
    pub fn contains(&self, provider_name: &str) -> bool {
        self.providers.contains_key(&normalize_name(provider_name))
    }

    /// List registered provider names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Canonical registry key for a provider name.
pub fn normalize_name(provider_name: &str) -> String {
    provider_name.trim().to_ascii_lowercase()
}
