use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use super::callback::CallbackUri;
use super::lock::KeyLocks;
use super::pkce::{AuthorizationRequest, PkceVerifier};
use super::store::TokenStore;
use super::token::{Token, TokenKey};
use crate::error::OAuthError;
use crate::provider::{ProtocolVariant, ProviderConfig};
use crate::util::timeout::with_timeout;

/// A client bound to one provider's credentials, one callback URI, and the
/// shared token store.
///
/// Built per request by [`OAuthFactory`](super::OAuthFactory); never reused
/// across requests because the callback depends on the inbound request.
#[derive(Clone)]
pub struct OAuthClient {
    provider: Arc<ProviderConfig>,
    callback: CallbackUri,
    http: reqwest::Client,
    store: Arc<dyn TokenStore>,
    store_timeout: Duration,
    locks: Arc<KeyLocks>,
}

impl fmt::Debug for OAuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClient")
            .field("provider", &self.provider.name)
            .field("protocol", &self.provider.protocol)
            .field("callback", &self.callback.as_str())
            .field("scopes", &self.provider.scopes)
            .finish()
    }
}

impl OAuthClient {
    pub(crate) fn new(
        provider: Arc<ProviderConfig>,
        callback: CallbackUri,
        http: reqwest::Client,
        store: Arc<dyn TokenStore>,
        store_timeout: Duration,
        locks: Arc<KeyLocks>,
    ) -> Self {
        Self {
            provider,
            callback,
            http,
            store,
            store_timeout,
            locks,
        }
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    pub fn name(&self) -> &str {
        &self.provider.name
    }

    pub fn protocol(&self) -> ProtocolVariant {
        self.provider.protocol
    }

    pub fn key(&self) -> &str {
        &self.provider.key
    }

    pub fn scopes(&self) -> &[String] {
        &self.provider.scopes
    }

    pub fn callback_uri(&self) -> &CallbackUri {
        &self.callback
    }

    pub fn token_key(&self, session_id: &str) -> TokenKey {
        TokenKey::new(session_id, &self.provider.name)
    }

    /// URL to redirect the user to for authorization.
    ///
    /// OAuth2 providers get the standard code-flow parameters (plus PKCE when
    /// requested). OAuth1 providers need the request token the caller obtained.
    pub fn authorization_url(&self, request: &AuthorizationRequest) -> Result<Url, OAuthError> {
        let mut url = self.provider.authorize_url.clone();
        match self.provider.protocol {
            ProtocolVariant::OAuth2 => {
                let mut pairs = url.query_pairs_mut();
                pairs
                    .append_pair("response_type", "code")
                    .append_pair("client_id", &self.provider.key)
                    .append_pair("redirect_uri", self.callback.as_str());
                if !self.provider.scopes.is_empty() {
                    pairs.append_pair("scope", &self.provider.scopes.join(" "));
                }
                pairs.append_pair("state", &request.state);
                if let Some(pkce) = &request.pkce {
                    pairs
                        .append_pair("code_challenge", &pkce.challenge())
                        .append_pair("code_challenge_method", "S256");
                }
            }
            ProtocolVariant::OAuth1 => {
                let request_token = request.request_token.as_deref().ok_or_else(|| {
                    OAuthError::InvalidArgument(format!(
                        "{} uses OAuth1 and needs a request token to build an authorization URL",
                        self.provider.name
                    ))
                })?;
                url.query_pairs_mut()
                    .append_pair("oauth_token", request_token);
            }
        }
        Ok(url)
    }

    /// Exchange an authorization code for a token and persist it for the session.
    pub async fn exchange_code(
        &self,
        session_id: &str,
        code: &str,
        pkce: Option<&PkceVerifier>,
    ) -> Result<Token, OAuthError> {
        self.require_oauth2("authorization code exchange")?;
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.callback.as_str()),
            ("client_id", self.provider.key.as_str()),
            ("client_secret", self.provider.secret.as_str()),
        ];
        if let Some(verifier) = pkce {
            form.push(("code_verifier", verifier.secret()));
        }
        tracing::debug!(provider = %self.provider.name, "Exchanging authorization code");
        let payload = self.post_token_request(&form).await?;
        let token = payload.into_token(&self.provider.name, session_id, None)?;
        let key = self.token_key(session_id);
        let _held = self.locks.acquire(&key).await;
        self.store_put(&key, &token).await?;
        tracing::info!(provider = %self.provider.name, "Stored token from code exchange");
        Ok(token)
    }

    /// Renew an expired token with its refresh grant.
    ///
    /// Does not persist the result; the caller decides how to commit it.
    pub async fn refresh(&self, token: &Token) -> Result<Token, OAuthError> {
        self.require_oauth2("token refresh")?;
        let refresh_token = token.refresh_token.as_deref().ok_or_else(|| {
            OAuthError::InvalidArgument("token has no refresh token".to_string())
        })?;
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.provider.key.as_str()),
            ("client_secret", self.provider.secret.as_str()),
        ];
        tracing::debug!(provider = %self.provider.name, "Refreshing access token");
        let payload = self.post_token_request(&form).await?;
        payload.into_token(&self.provider.name, &token.session_id, Some(token))
    }

    /// Persist a token obtained outside this client (e.g. an OAuth1 handshake).
    ///
    /// The token is re-bound to this client's provider and the given session.
    /// Waits for any in-flight refresh of the same key, then overwrites it.
    pub async fn store_token(&self, session_id: &str, mut token: Token) -> Result<(), OAuthError> {
        token.provider = self.provider.name.clone();
        token.session_id = session_id.to_string();
        let key = self.token_key(session_id);
        let _held = self.locks.acquire(&key).await;
        self.store_put(&key, &token).await
    }

    pub async fn load_token(&self, session_id: &str) -> Result<Option<Token>, OAuthError> {
        self.store_get(&self.token_key(session_id)).await
    }

    /// Whether any token is stored for the session, live or not.
    pub async fn has_access_token(&self, session_id: &str) -> Result<bool, OAuthError> {
        Ok(self.load_token(session_id).await?.is_some())
    }

    /// Remove the session's token. An in-flight refresh finishes first, so a
    /// refreshed token can never reappear after logout.
    pub async fn logout(&self, session_id: &str) -> Result<(), OAuthError> {
        let key = self.token_key(session_id);
        let _held = self.locks.acquire(&key).await;
        self.store_delete(&key).await?;
        tracing::info!(provider = %self.provider.name, "Cleared stored token");
        Ok(())
    }

    pub(crate) fn key_locks(&self) -> &Arc<KeyLocks> {
        &self.locks
    }

    // Writers below assume the caller holds the key's lock.

    pub(crate) async fn store_get(&self, key: &TokenKey) -> Result<Option<Token>, OAuthError> {
        with_timeout(self.store_timeout, self.store.get(key)).await
    }

    pub(crate) async fn store_put(&self, key: &TokenKey, token: &Token) -> Result<(), OAuthError> {
        with_timeout(self.store_timeout, self.store.put(key, token)).await
    }

    pub(crate) async fn store_delete(&self, key: &TokenKey) -> Result<(), OAuthError> {
        with_timeout(self.store_timeout, self.store.delete(key)).await
    }

    fn require_oauth2(&self, operation: &str) -> Result<(), OAuthError> {
        match self.provider.protocol {
            ProtocolVariant::OAuth2 => Ok(()),
            ProtocolVariant::OAuth1 => Err(OAuthError::Unsupported(format!(
                "{operation} is not available for OAuth1 provider {}",
                self.provider.name
            ))),
        }
    }

    async fn post_token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, OAuthError> {
        let resp = self
            .http
            .post(self.provider.token_url.clone())
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            tracing::warn!(provider = %self.provider.name, %status, "Token endpoint rejected grant");
            return Err(OAuthError::InvalidGrant);
        }
        if !status.is_success() {
            return Err(OAuthError::InvalidResponse(format!(
                "token request to {} failed with status {status}",
                self.provider.name
            )));
        }
        let payload: TokenResponse = resp.json().await?;
        Ok(payload)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<serde_json::Value>,
    token_type: Option<String>,
    scope: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenResponse {
    /// `previous` supplies the refresh token when a refresh response omits one.
    fn into_token(
        self,
        provider: &str,
        session_id: &str,
        previous: Option<&Token>,
    ) -> Result<Token, OAuthError> {
        if let Some(error) = self.error {
            return match error.as_str() {
                "invalid_grant" | "bad_verification_code" | "bad_refresh_token" => {
                    Err(OAuthError::InvalidGrant)
                }
                _ => Err(OAuthError::InvalidResponse(match self.error_description {
                    Some(description) => format!("{error}: {description}"),
                    None => error,
                })),
            };
        }
        let access_token = self.access_token.ok_or_else(|| {
            OAuthError::InvalidResponse("token response missing access_token".to_string())
        })?;
        let now = Utc::now();
        let expires_at = self
            .expires_in
            .map(|value| parse_expires_in(&value, now))
            .transpose()?;
        let refresh_token = self
            .refresh_token
            .or_else(|| previous.and_then(|token| token.refresh_token.clone()));
        let scopes = match self.scope {
            Some(scope) => Some(split_scopes(&scope)),
            None => previous.and_then(|token| token.scopes.clone()),
        };
        let mut token = Token::new(access_token, provider, session_id);
        token.refresh_token = refresh_token;
        token.expires_at = expires_at;
        token.token_type = self.token_type;
        token.scopes = scopes;
        token.last_refresh = Some(now);
        Ok(token)
    }
}

fn parse_expires_in(value: &serde_json::Value, now: DateTime<Utc>) -> Result<DateTime<Utc>, OAuthError> {
    let secs = match value {
        serde_json::Value::Number(num) => num.as_i64(),
        serde_json::Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| OAuthError::InvalidResponse(format!("invalid expires_in: {value}")))?;
    chrono::TimeDelta::try_seconds(secs)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| OAuthError::InvalidResponse(format!("expires_in out of range: {secs}")))
}

fn split_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ' ' || c == ',')
        .map(str::trim)
        .filter(|scope| !scope.is_empty())
        .map(str::to_string)
        .collect()
}
