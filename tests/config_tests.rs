//! Tests for credential loading and factory settings.

use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use oauth_factory::config::{CredentialStore, FactorySettings};
use oauth_factory::error::OAuthError;
use oauth_factory::provider::{ProtocolVariant, ProviderRegistry};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

const SETTINGS_ENV_VARS: [&str; 3] = [
    "OAUTH_CALLBACK_SEGMENT",
    "OAUTH_STORE_TIMEOUT_MS",
    "OAUTH_HTTP_TIMEOUT_MS",
];

struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn capture(keys: &[&str]) -> Self {
        let saved = keys
            .iter()
            .map(|key| ((*key).to_string(), std::env::var(key).ok()))
            .collect();
        Self { saved }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.saved {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn env_lock_guard() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[test]
fn credentials_file_round_trips_into_registry() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("credentials.toml");
    std::fs::write(
        &path,
        r#"
        [providers.GitHub]
        key = "gh-id"
        secret = "gh-secret"
        scopes = ["user", "repo"]

        [providers.acme]
        key = "K"
        secret = "S"
        authorize_url = "https://acme.example/oauth/authorize"
        token_url = "https://acme.example/oauth/token"
        "#,
    )
    .unwrap();

    let credentials = CredentialStore::from_path(&path).unwrap();
    let registry = ProviderRegistry::new(credentials);

    assert_eq!(registry.names(), vec!["acme", "github"]);
    let github = registry.resolve("GITHUB").unwrap();
    assert_eq!(github.key, "gh-id");
    assert_eq!(github.scopes, vec!["user", "repo"]);
    assert_eq!(github.protocol, ProtocolVariant::OAuth2);

    let acme = registry.resolve(" Acme ").unwrap();
    assert_eq!(acme.token_url.as_str(), "https://acme.example/oauth/token");
    assert!(acme.scopes.is_empty());
}

#[test]
fn missing_credentials_file_is_configuration_error() {
    let dir = TempDir::new().unwrap();
    let err = CredentialStore::from_path(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, OAuthError::Configuration(_)));
}

#[test]
fn custom_provider_without_endpoints_is_rejected() {
    let err = CredentialStore::from_toml_str(
        r#"
        [providers.acme]
        key = "K"
        secret = "S"
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, OAuthError::Configuration(ref msg) if msg.contains("acme")));
}

#[test]
fn env_vars_build_oauth1_and_oauth2_providers() {
    let credentials = CredentialStore::from_vars([
        ("OAUTH_TWITTER_KEY", "tw-key"),
        ("OAUTH_TWITTER_SECRET", "tw-secret"),
        ("OAUTH_GOOGLE_KEY", "g-key"),
        ("OAUTH_GOOGLE_SECRET", "g-secret"),
        ("OAUTH_GOOGLE_SCOPES", "openid, email"),
        ("PATH", "/usr/bin"),
    ])
    .unwrap();

    assert_eq!(credentials.len(), 2);
    let twitter = credentials.get("twitter").unwrap();
    assert_eq!(twitter.protocol, ProtocolVariant::OAuth1);
    assert!(twitter.request_token_url.is_some());
    let google = credentials.get("Google").unwrap();
    assert_eq!(google.scopes, vec!["openid", "email"]);
}

#[test]
fn env_var_missing_secret_fails_fast() {
    let err = CredentialStore::from_vars([("OAUTH_GITHUB_KEY", "gh")]).unwrap_err();
    assert!(matches!(err, OAuthError::Configuration(_)));
}

#[test]
fn settings_from_env_applies_overrides() {
    let _lock = env_lock_guard();
    let _guard = EnvGuard::capture(&SETTINGS_ENV_VARS);
    std::env::set_var("OAUTH_CALLBACK_SEGMENT", "/oauth-return/");
    std::env::set_var("OAUTH_STORE_TIMEOUT_MS", "250");
    std::env::set_var("OAUTH_HTTP_TIMEOUT_MS", "not-a-number");

    let settings = FactorySettings::from_env();

    assert_eq!(settings.callback_segment, "oauth-return");
    assert_eq!(settings.store_timeout, Duration::from_millis(250));
    assert_eq!(settings.http_timeout, FactorySettings::default().http_timeout);
}

#[test]
fn settings_from_env_defaults_without_overrides() {
    let _lock = env_lock_guard();
    let _guard = EnvGuard::capture(&SETTINGS_ENV_VARS);
    for key in SETTINGS_ENV_VARS {
        std::env::remove_var(key);
    }

    let settings = FactorySettings::from_env();

    assert_eq!(settings.callback_segment, "callback");
    assert_eq!(settings.store_timeout, Duration::from_secs(5));
    assert_eq!(settings.http_timeout, Duration::from_secs(10));
}
