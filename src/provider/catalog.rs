//! Built-in endpoint catalog for well-known providers.
//!
//! Lets a credentials file carry only `key` and `secret` for these providers.

use super::ProtocolVariant;

/// Static endpoint description for a well-known provider.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub protocol: ProtocolVariant,
    pub authorize_url: &'static str,
    pub token_url: &'static str,
    pub request_token_url: Option<&'static str>,
    pub default_scopes: &'static [&'static str],
}

const ENTRIES: &[CatalogEntry] = &[
    CatalogEntry {
        name: "github",
        protocol: ProtocolVariant::OAuth2,
        authorize_url: "https://github.com/login/oauth/authorize",
        token_url: "https://github.com/login/oauth/access_token",
        request_token_url: None,
        default_scopes: &["user"],
    },
    CatalogEntry {
        name: "google",
        protocol: ProtocolVariant::OAuth2,
        authorize_url: "https://accounts.google.com/o/oauth2/v2/auth",
        token_url: "https://oauth2.googleapis.com/token",
        request_token_url: None,
        default_scopes: &["openid", "email", "profile"],
    },
    CatalogEntry {
        name: "gitlab",
        protocol: ProtocolVariant::OAuth2,
        authorize_url: "https://gitlab.com/oauth/authorize",
        token_url: "https://gitlab.com/oauth/token",
        request_token_url: None,
        default_scopes: &["read_user"],
    },
    CatalogEntry {
        name: "bitbucket",
        protocol: ProtocolVariant::OAuth2,
        authorize_url: "https://bitbucket.org/site/oauth2/authorize",
        token_url: "https://bitbucket.org/site/oauth2/access_token",
        request_token_url: None,
        default_scopes: &["account"],
    },
    CatalogEntry {
        name: "facebook",
        protocol: ProtocolVariant::OAuth2,
        authorize_url: "https://www.facebook.com/v19.0/dialog/oauth",
        token_url: "https://graph.facebook.com/v19.0/oauth/access_token",
        request_token_url: None,
        default_scopes: &["email"],
    },
    CatalogEntry {
        name: "microsoft",
        protocol: ProtocolVariant::OAuth2,
        authorize_url: "https://login.microsoftonline.com/common/oauth2/v2.0/authorize",
        token_url: "https://login.microsoftonline.com/common/oauth2/v2.0/token",
        request_token_url: None,
        default_scopes: &["openid", "offline_access", "User.Read"],
    },
    CatalogEntry {
        name: "twitter",
        protocol: ProtocolVariant::OAuth1,
        authorize_url: "https://api.twitter.com/oauth/authenticate",
        token_url: "https://api.twitter.com/oauth/access_token",
        request_token_url: Some("https://api.twitter.com/oauth/request_token"),
        default_scopes: &[],
    },
    CatalogEntry {
        name: "tumblr",
        protocol: ProtocolVariant::OAuth1,
        authorize_url: "https://www.tumblr.com/oauth/authorize",
        token_url: "https://www.tumblr.com/oauth/access_token",
        request_token_url: Some("https://www.tumblr.com/oauth/request_token"),
        default_scopes: &[],
    },
];

/// Look up a catalog entry by already-normalized (lower-case) name.
pub fn lookup(name: &str) -> Option<&'static CatalogEntry> {
    ENTRIES.iter().find(|entry| entry.name == name)
}

/// All catalog entries.
pub fn entries() -> &'static [CatalogEntry] {
    ENTRIES
}
