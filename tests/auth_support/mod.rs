#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use oauth_factory::auth::{OAuthFactory, Token, TokenKey, TokenStore};
use oauth_factory::config::{CredentialStore, FactorySettings};
use oauth_factory::error::OAuthError;

/// Token store that counts calls and can be slowed down.
#[derive(Default)]
pub struct CountingTokenStore {
    tokens: Mutex<HashMap<TokenKey, Token>>,
    delay: Option<Duration>,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl CountingTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn seed(&self, token: Token) {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .insert(token.key(), token);
    }

    pub fn peek(&self, session_id: &str, provider: &str) -> Option<Token> {
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .get(&TokenKey::new(session_id, provider))
            .cloned()
    }

    pub fn calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
            + self.puts.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl TokenStore for CountingTokenStore {
    async fn get(&self, key: &TokenKey) -> Result<Option<Token>, OAuthError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(self.tokens.lock().expect("store lock poisoned").get(key).cloned())
    }

    async fn put(&self, key: &TokenKey, token: &Token) -> Result<(), OAuthError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.tokens
            .lock()
            .expect("store lock poisoned")
            .insert(key.clone(), token.clone());
        Ok(())
    }

    async fn delete(&self, key: &TokenKey) -> Result<(), OAuthError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.tokens.lock().expect("store lock poisoned").remove(key);
        Ok(())
    }
}

/// Credentials for a custom OAuth2 provider whose endpoints live under `base`.
pub fn acme_credentials(base: &str) -> CredentialStore {
    CredentialStore::from_toml_str(&format!(
        r#"
        [providers.acme]
        key = "acme-key"
        secret = "acme-secret"
        authorize_url = "{base}/authorize"
        token_url = "{base}/token"
        scopes = ["read"]
        "#
    ))
    .expect("acme credentials")
}

pub fn factory_with(store: Arc<CountingTokenStore>, base: &str) -> OAuthFactory {
    OAuthFactory::new(acme_credentials(base), store).expect("factory")
}

pub fn factory_with_settings(
    store: Arc<CountingTokenStore>,
    base: &str,
    settings: FactorySettings,
) -> OAuthFactory {
    OAuthFactory::with_settings(acme_credentials(base), store, settings).expect("factory")
}

pub fn token(
    session_id: &str,
    access: &str,
    refresh: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
) -> Token {
    let mut token = Token::new(access, "acme", session_id);
    if let Some(refresh) = refresh {
        token = token.with_refresh_token(refresh);
    }
    if let Some(expires_at) = expires_at {
        token = token.with_expires_at(expires_at);
    }
    token
}
