//! Provider descriptors: protocol variant, endpoints, and the registry that
//! resolves user-supplied provider names to them.

pub mod catalog;
pub mod registry;

pub use catalog::CatalogEntry;
pub use registry::{normalize_name, ProviderRegistry};

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

/// OAuth protocol family spoken by a provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ProtocolVariant {
    OAuth1,
    OAuth2,
}

impl ProtocolVariant {
    /// Whether tokens for this protocol can be renewed with a refresh grant.
    pub fn supports_refresh(self) -> bool {
        matches!(self, Self::OAuth2)
    }
}

/// Fully resolved configuration for one provider.
///
/// Immutable once loaded; shared as `Arc<ProviderConfig>` for the process lifetime.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Lower-cased provider name.
    pub name: String,
    pub protocol: ProtocolVariant,
    pub key: String,
    pub secret: String,
    pub authorize_url: Url,
    pub token_url: Url,
    /// OAuth1 only.
    pub request_token_url: Option<Url>,
    pub scopes: Vec<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("protocol", &self.protocol)
            .field("key", &self.key)
            .field("secret", &"..")
            .field("authorize_url", &self.authorize_url.as_str())
            .field("token_url", &self.token_url.as_str())
            .field(
                "request_token_url",
                &self.request_token_url.as_ref().map(Url::as_str),
            )
            .field("scopes", &self.scopes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_parses_case_insensitively() {
        assert_eq!("OAuth2".parse::<ProtocolVariant>().unwrap(), ProtocolVariant::OAuth2);
        assert_eq!("oauth1".parse::<ProtocolVariant>().unwrap(), ProtocolVariant::OAuth1);
        assert!("oauth3".parse::<ProtocolVariant>().is_err());
    }

    #[test]
    fn protocol_displays_lowercase() {
        assert_eq!(ProtocolVariant::OAuth2.to_string(), "oauth2");
    }

    #[test]
    fn debug_redacts_secret() {
        let config = ProviderConfig {
            name: "acme".into(),
            protocol: ProtocolVariant::OAuth2,
            key: "K".into(),
            secret: "super-secret".into(),
            authorize_url: Url::parse("https://acme.example/authorize").unwrap(),
            token_url: Url::parse("https://acme.example/token").unwrap(),
            request_token_url: None,
            scopes: vec![],
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("acme"));
    }
}
