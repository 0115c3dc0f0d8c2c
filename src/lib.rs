//! oauth-factory: per-request OAuth clients over session-scoped token storage.
//!
//! Loads per-provider credentials once, builds a client bound to a provider's
//! credentials and a callback URI derived from the current request, and
//! answers whether a session is authenticated, refreshing OAuth2 tokens
//! transparently.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use oauth_factory::prelude::*;
//!
//! # async fn example() -> oauth_factory::error::Result<()> {
//! let credentials = CredentialStore::from_env()?;
//! let factory = OAuthFactory::new(credentials, Arc::new(MemoryTokenStore::new()))?;
//!
//! let scope = factory.scope(RequestContext::from_url("https://app.example/login")?, "sess1");
//! if !scope.is_authenticated(Some("github")).await? {
//!     let client = scope.create_service("github")?;
//!     let redirect = client.authorization_url(&AuthorizationRequest::new())?;
//!     println!("redirect to {redirect}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
