//! Configuration: provider credentials plus factory-wide settings.

pub mod credentials;

pub use credentials::{CredentialStore, ProviderEntry};

use std::path::PathBuf;
use std::time::Duration;

use bon::Builder;

use crate::error::OAuthError;

/// Path segment appended to the request URI to form the OAuth callback.
pub const DEFAULT_CALLBACK_SEGMENT: &str = "callback";
/// Upper bound on any single token store operation.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);
/// Request timeout for token endpoint calls.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Factory-wide settings.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use oauth_factory::config::FactorySettings;
///
/// let settings = FactorySettings::builder()
///     .store_timeout(Duration::from_secs(2))
///     .build();
/// assert_eq!(settings.callback_segment, "callback");
/// ```
#[derive(Debug, Clone, Builder)]
pub struct FactorySettings {
    #[builder(into, default = DEFAULT_CALLBACK_SEGMENT.to_string())]
    pub callback_segment: String,
    #[builder(default = DEFAULT_STORE_TIMEOUT)]
    pub store_timeout: Duration,
    #[builder(default = DEFAULT_HTTP_TIMEOUT)]
    pub http_timeout: Duration,
}

impl Default for FactorySettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl FactorySettings {
    /// Apply `OAUTH_CALLBACK_SEGMENT`, `OAUTH_STORE_TIMEOUT_MS` and
    /// `OAUTH_HTTP_TIMEOUT_MS` over the defaults. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let mut settings = Self::default();
        if let Ok(segment) = std::env::var("OAUTH_CALLBACK_SEGMENT") {
            let segment = segment.trim().trim_matches('/');
            if !segment.is_empty() {
                settings.callback_segment = segment.to_string();
            }
        }
        if let Some(ms) = env_millis("OAUTH_STORE_TIMEOUT_MS") {
            settings.store_timeout = ms;
        }
        if let Some(ms) = env_millis("OAUTH_HTTP_TIMEOUT_MS") {
            settings.http_timeout = ms;
        }
        settings
    }

    /// Normalize the callback segment (surrounding whitespace and slashes
    /// dropped) and reject it if nothing is left.
    pub fn validated(mut self) -> Result<Self, OAuthError> {
        let segment = self.callback_segment.trim().trim_matches('/');
        if segment.is_empty() {
            return Err(OAuthError::Configuration(
                "callback_segment must not be blank".to_string(),
            ));
        }
        self.callback_segment = segment.to_string();
        Ok(self)
    }
}

fn env_millis(var: &str) -> Option<Duration> {
    let raw = std::env::var(var).ok()?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(_) => {
            tracing::warn!(var, value = %raw, "Ignoring non-numeric timeout override");
            None
        }
    }
}

/// Default directory for the file-backed token store (`~/.oauth-factory/tokens`).
pub fn default_token_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".oauth-factory").join("tokens"))
        .unwrap_or_else(|| PathBuf::from(".oauth-factory").join("tokens"))
}
