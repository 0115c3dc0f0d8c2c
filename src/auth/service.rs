use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use super::callback::RequestContext;
use super::checker::AuthenticationChecker;
use super::client::OAuthClient;
use super::store::TokenStore;
use super::token::AuthState;
use crate::config::{CredentialStore, FactorySettings};
use crate::error::OAuthError;
use crate::provider::{normalize_name, ProviderRegistry};

/// Builds provider-bound [`OAuthClient`]s and owns the shared pieces they use:
/// the provider registry, token store, HTTP client, and authentication checker.
///
/// Create one per process and share it; open a [`RequestScope`] per inbound request.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use oauth_factory::auth::{MemoryTokenStore, OAuthFactory, RequestContext};
/// use oauth_factory::config::CredentialStore;
///
/// # async fn example() -> oauth_factory::error::Result<()> {
/// let credentials = CredentialStore::from_toml_str(r#"
///     [providers.github]
///     key = "client-id"
///     secret = "client-secret"
/// "#)?;
/// let factory = OAuthFactory::new(credentials, Arc::new(MemoryTokenStore::new()))?;
///
/// let ctx = RequestContext::from_url("https://app.example/login/github?next=/")?;
/// let scope = factory.scope(ctx, "session-cookie-value");
/// let github = scope.create_service("GitHub")?;
/// assert_eq!(github.callback_uri().as_str(), "https://app.example/login/github/callback");
/// let signed_in = scope.is_authenticated(Some("github")).await?;
/// # Ok(())
/// # }
/// ```
pub struct OAuthFactory {
    registry: ProviderRegistry,
    store: Arc<dyn TokenStore>,
    http: reqwest::Client,
    settings: FactorySettings,
    checker: AuthenticationChecker,
}

impl fmt::Debug for OAuthFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthFactory")
            .field("providers", &self.registry.names())
            .field("settings", &self.settings)
            .field("token_store", &"..")
            .finish()
    }
}

impl OAuthFactory {
    pub fn new(credentials: CredentialStore, store: Arc<dyn TokenStore>) -> Result<Self, OAuthError> {
        Self::with_settings(credentials, store, FactorySettings::default())
    }

    pub fn with_settings(
        credentials: CredentialStore,
        store: Arc<dyn TokenStore>,
        settings: FactorySettings,
    ) -> Result<Self, OAuthError> {
        let settings = settings.validated()?;
        let http = reqwest::Client::builder()
            .timeout(settings.http_timeout)
            .build()
            .map_err(|err| OAuthError::Configuration(format!("failed to build HTTP client: {err}")))?;
        let registry = ProviderRegistry::new(credentials);
        tracing::info!(providers = ?registry.names(), "OAuth factory ready");
        Ok(Self {
            registry,
            store,
            http,
            settings,
            checker: AuthenticationChecker::new(),
        })
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &FactorySettings {
        &self.settings
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn checker(&self) -> &AuthenticationChecker {
        &self.checker
    }

    /// Build a client for `provider_name` whose callback derives from `context`.
    ///
    /// Nothing is cached: the callback URI is recomputed on every call.
    pub fn build(&self, provider_name: &str, context: &RequestContext) -> Result<OAuthClient, OAuthError> {
        let provider = self.registry.resolve(provider_name)?;
        let callback = context.callback_uri(&self.settings.callback_segment);
        tracing::debug!(
            provider = %provider.name,
            callback = %callback,
            "Built OAuth client"
        );
        Ok(OAuthClient::new(
            provider,
            callback,
            self.http.clone(),
            self.store.clone(),
            self.settings.store_timeout,
            self.checker.key_locks(),
        ))
    }

    /// Open the per-request handle for one session.
    pub fn scope(&self, context: RequestContext, session_id: impl Into<String>) -> RequestScope<'_> {
        RequestScope {
            factory: self,
            context,
            session_id: session_id.into(),
            services: Mutex::new(HashMap::new()),
        }
    }
}

/// Per-request view of the factory: one request context, one session.
///
/// Clients are memoized per normalized provider name for the scope's lifetime,
/// so asking for two providers yields two distinct clients.
pub struct RequestScope<'a> {
    factory: &'a OAuthFactory,
    context: RequestContext,
    session_id: String,
    services: Mutex<HashMap<String, Arc<OAuthClient>>>,
}

impl fmt::Debug for RequestScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestScope")
            .field("context", &self.context.url().as_str())
            .finish_non_exhaustive()
    }
}

impl RequestScope<'_> {
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Get the client for `provider_name`, building it on first use in this request.
    pub fn create_service(&self, provider_name: &str) -> Result<Arc<OAuthClient>, OAuthError> {
        let key = normalize_name(provider_name);
        if let Some(client) = self.memoized(&key) {
            return Ok(client);
        }
        let client = Arc::new(self.factory.build(provider_name, &self.context)?);
        let mut services = self
            .services
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(services.entry(key).or_insert(client).clone())
    }

    /// Whether this session holds a live token for the provider.
    ///
    /// `None` or a blank name means no provider was selected: `Ok(false)`
    /// without touching the token store. An unregistered name is an error.
    pub async fn is_authenticated(&self, provider_name: Option<&str>) -> Result<bool, OAuthError> {
        let Some(name) = selected(provider_name) else {
            return Ok(false);
        };
        let client = self.create_service(name)?;
        self.factory.checker.check(&client, &self.session_id).await
    }

    /// Stored lifecycle state for the provider, without refreshing.
    pub async fn state(&self, provider_name: &str) -> Result<AuthState, OAuthError> {
        let client = self.create_service(provider_name)?;
        self.factory.checker.state(&client, &self.session_id).await
    }

    /// Remove this session's token for the provider.
    pub async fn logout(&self, provider_name: &str) -> Result<(), OAuthError> {
        let client = self.create_service(provider_name)?;
        client.logout(&self.session_id).await
    }

    fn memoized(&self, key: &str) -> Option<Arc<OAuthClient>> {
        self.services
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }
}

fn selected(provider_name: Option<&str>) -> Option<&str> {
    provider_name.map(str::trim).filter(|name| !name.is_empty())
}
