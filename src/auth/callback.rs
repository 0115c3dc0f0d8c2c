//! Request context and callback URI derivation.

use std::fmt;

use url::Url;

use crate::error::OAuthError;

/// The inbound request a client is being built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    url: Url,
}

impl RequestContext {
    /// Build from an absolute `http`/`https` request URL.
    pub fn from_url(raw: &str) -> Result<Self, OAuthError> {
        let url = Url::parse(raw.trim())?;
        Self::from_parsed(url)
    }

    /// Build from the pieces a server sees: scheme, `Host` header, and request target.
    ///
    /// `host` may carry a port (`example.com:8080`); default ports are dropped.
    pub fn from_parts(scheme: &str, host: &str, request_uri: &str) -> Result<Self, OAuthError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(OAuthError::InvalidArgument(
                "request host must not be empty".to_string(),
            ));
        }
        let target = if request_uri.starts_with('/') {
            request_uri.to_string()
        } else {
            format!("/{request_uri}")
        };
        Self::from_url(&format!("{}://{host}{target}", scheme.trim()))
    }

    fn from_parsed(url: Url) -> Result<Self, OAuthError> {
        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(OAuthError::InvalidArgument(format!(
                    "unsupported request scheme '{other}'"
                )));
            }
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(OAuthError::InvalidArgument(
                "request URL has no host".to_string(),
            ));
        }
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Derive the callback URI: the request URI without query, fragment or
    /// userinfo, with `/<segment>` appended.
    pub fn callback_uri(&self, segment: &str) -> CallbackUri {
        let mut url = self.url.clone();
        url.set_query(None);
        url.set_fragment(None);
        let _ = url.set_username("");
        let _ = url.set_password(None);

        let base = url.path().trim_end_matches('/').to_string();
        let segment = segment.trim_matches('/');
        url.set_path(&format!("{base}/{segment}"));
        CallbackUri(url)
    }
}

/// Redirect target registered with a provider. Never carries a query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackUri(Url);

impl CallbackUri {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for CallbackUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}
