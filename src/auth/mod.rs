//! OAuth client construction, token storage, and session authentication checks.

pub mod callback;
pub mod checker;
pub mod client;
pub mod lock;
pub mod pkce;
pub mod service;
pub mod store;
pub mod token;

pub use callback::{CallbackUri, RequestContext};
pub use checker::AuthenticationChecker;
pub use client::OAuthClient;
pub use lock::{KeyGuard, KeyLocks};
pub use pkce::{AuthorizationRequest, PkceVerifier};
pub use service::{OAuthFactory, RequestScope};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore, TokenStoreConfig};
pub use token::{AuthState, Token, TokenKey};
