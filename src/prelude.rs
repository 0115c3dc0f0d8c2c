//! Convenience re-exports for common use.

pub use crate::auth::{
    AuthState, AuthorizationRequest, FileTokenStore, MemoryTokenStore, OAuthClient, OAuthFactory,
    RequestContext, RequestScope, Token, TokenKey, TokenStore, TokenStoreConfig,
};
pub use crate::config::{CredentialStore, FactorySettings};
pub use crate::error::{OAuthError, Result};
pub use crate::provider::{ProtocolVariant, ProviderConfig, ProviderRegistry};
