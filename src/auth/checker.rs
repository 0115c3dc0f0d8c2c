use std::sync::Arc;

use chrono::Utc;

use super::client::OAuthClient;
use super::lock::KeyLocks;
use super::token::{AuthState, TokenKey};
use crate::error::OAuthError;

/// Answers "is this session authenticated for this provider", refreshing
/// expired OAuth2 tokens once when a refresh token is available.
///
/// Refreshes take the same per-key lock as [`OAuthClient::store_token`] and
/// [`OAuthClient::logout`], so writes to one key are serialized while
/// different keys never contend.
#[derive(Debug, Default)]
pub struct AuthenticationChecker {
    locks: Arc<KeyLocks>,
}

impl AuthenticationChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock table shared with every client the factory builds.
    pub(crate) fn key_locks(&self) -> Arc<KeyLocks> {
        Arc::clone(&self.locks)
    }

    /// Keys with a refresh or write currently holding or awaiting the lock.
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }

    /// Stored lifecycle state, without attempting a refresh.
    pub async fn state(&self, client: &OAuthClient, session_id: &str) -> Result<AuthState, OAuthError> {
        let token = client.load_token(session_id).await?;
        Ok(AuthState::of(token.as_ref(), Utc::now()))
    }

    /// `Ok(true)` iff a live token exists after at most one refresh attempt.
    ///
    /// Store read failures (including timeouts) propagate. Refresh failures
    /// never do; they degrade to `Ok(false)`.
    pub async fn check(&self, client: &OAuthClient, session_id: &str) -> Result<bool, OAuthError> {
        let key = client.token_key(session_id);
        let Some(token) = client.store_get(&key).await? else {
            return Ok(false);
        };
        if token.is_active_at(Utc::now()) {
            return Ok(true);
        }
        if !client.protocol().supports_refresh() || token.refresh_token.is_none() {
            tracing::debug!(provider = %client.name(), "Token expired and cannot be refreshed");
            return Ok(false);
        }
        Ok(self.refresh_expired(client, key).await)
    }

    async fn refresh_expired(&self, client: &OAuthClient, key: TokenKey) -> bool {
        let locks = Arc::clone(client.key_locks());
        let task_client = client.clone();
        // Detached: a cancelled caller neither abandons the refresh nor leaks its lock entry.
        let task = tokio::spawn(async move {
            let _held = locks.acquire(&key).await;
            refresh_locked(&task_client, &key).await
        });

        match task.await {
            Ok(Ok(active)) => active,
            Ok(Err(err)) => {
                tracing::warn!(provider = %client.name(), error = %err, "Token refresh failed");
                false
            }
            Err(err) => {
                tracing::warn!(provider = %client.name(), error = %err, "Token refresh task aborted");
                false
            }
        }
    }
}

/// Refresh under the per-key guard. Re-reads first so that a refresh
/// committed by a concurrent request is reused, not repeated.
async fn refresh_locked(client: &OAuthClient, key: &TokenKey) -> Result<bool, OAuthError> {
    let Some(current) = client.store_get(key).await? else {
        return Ok(false);
    };
    if current.is_active_at(Utc::now()) {
        tracing::debug!(provider = %client.name(), "Concurrent refresh already renewed token");
        return Ok(true);
    }
    match client.refresh(&current).await {
        Ok(fresh) => {
            let active = fresh.is_active_at(Utc::now());
            client.store_put(key, &fresh).await?;
            tracing::info!(provider = %client.name(), "Refreshed access token");
            Ok(active)
        }
        Err(OAuthError::InvalidGrant) => {
            client.store_delete(key).await?;
            Err(OAuthError::RefreshFailure(
                "refresh grant rejected; stored token removed".to_string(),
            ))
        }
        Err(err) => Err(OAuthError::RefreshFailure(err.to_string())),
    }
}
