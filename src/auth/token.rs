use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::provider::normalize_name;

/// OAuth token held in a token store for one (session, provider) pair.
///
/// # Example
/// ```
/// use chrono::{Duration, Utc};
/// use oauth_factory::auth::Token;
///
/// let token = Token::new("access", "github", "sess1")
///     .with_refresh_token("refresh")
///     .with_expires_at(Utc::now() + Duration::hours(1));
/// assert!(token.is_active_at(Utc::now()));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub provider: String,
    pub session_id: String,
    pub token_type: Option<String>,
    pub scopes: Option<Vec<String>>,
    pub last_refresh: Option<DateTime<Utc>>,
}

impl Token {
    pub fn new(
        access_token: impl Into<String>,
        provider: &str,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_at: None,
            provider: normalize_name(provider),
            session_id: session_id.into(),
            token_type: None,
            scopes: None,
            last_refresh: None,
        }
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// A token without an expiry never expires; one expiring exactly at `now` is expired.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |exp| exp > now)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_active_at(now)
    }

    pub fn key(&self) -> TokenKey {
        TokenKey::new(self.session_id.clone(), &self.provider)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"..")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| ".."))
            .field("expires_at", &self.expires_at)
            .field("provider", &self.provider)
            .field("session_id", &self.session_id)
            .field("token_type", &self.token_type)
            .field("scopes", &self.scopes)
            .field("last_refresh", &self.last_refresh)
            .finish()
    }
}

/// Token store key. The provider component is always normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenKey {
    pub session_id: String,
    pub provider: String,
}

impl TokenKey {
    pub fn new(session_id: impl Into<String>, provider: &str) -> Self {
        Self {
            session_id: session_id.into(),
            provider: normalize_name(provider),
        }
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.session_id)
    }
}

/// Stored lifecycle state for a (session, provider) pair.
///
/// The `Pending` phase between redirect and callback lives in the caller's
/// [`AuthorizationRequest`](super::AuthorizationRequest) and is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Absent,
    Active,
    Expired,
}

impl AuthState {
    pub fn of(token: Option<&Token>, now: DateTime<Utc>) -> Self {
        match token {
            None => Self::Absent,
            Some(token) if token.is_active_at(now) => Self::Active,
            Some(_) => Self::Expired,
        }
    }
}
