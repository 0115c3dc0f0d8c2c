//! Per-provider OAuth credentials, loaded once at startup.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::error::OAuthError;
use crate::provider::{catalog, normalize_name, ProtocolVariant, ProviderConfig};

const ENV_PREFIX_PATTERN: &str =
    r"^OAUTH_([A-Z0-9_]+?)_(KEY|SECRET|SCOPES|PROTOCOL|AUTHORIZE_URL|REQUEST_TOKEN_URL|TOKEN_URL)$";

static ENV_VAR_RE: OnceLock<Regex> = OnceLock::new();

/// One `[providers.<name>]` table as written by the operator.
///
/// Every field is optional at parse time so that missing values surface as
/// [`OAuthError::Configuration`] naming the provider, not as a serde error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderEntry {
    pub key: Option<String>,
    pub secret: Option<String>,
    pub protocol: Option<String>,
    pub authorize_url: Option<String>,
    pub token_url: Option<String>,
    pub request_token_url: Option<String>,
    pub scopes: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CredentialsFile {
    #[serde(default)]
    providers: BTreeMap<String, ProviderEntry>,
}

/// Validated provider credentials keyed by lower-cased provider name.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    providers: BTreeMap<String, Arc<ProviderConfig>>,
}

impl CredentialStore {
    /// Validate raw entries and merge them with the built-in catalog.
    ///
    /// Fails on the first entry that lacks a key or secret, names an
    /// unsupported protocol, or has no endpoints from either source.
    pub fn load(entries: BTreeMap<String, ProviderEntry>) -> Result<Self, OAuthError> {
        let mut providers = BTreeMap::new();
        for (raw_name, entry) in entries {
            let config = validate_entry(&raw_name, entry)?;
            if providers.contains_key(&config.name) {
                return Err(OAuthError::Configuration(format!(
                    "provider '{}' is configured more than once",
                    config.name
                )));
            }
            providers.insert(config.name.clone(), Arc::new(config));
        }
        tracing::debug!(providers = providers.len(), "Loaded OAuth credentials");
        Ok(Self { providers })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, OAuthError> {
        let file: CredentialsFile = toml::from_str(raw)
            .map_err(|err| OAuthError::Configuration(format!("invalid credentials file: {err}")))?;
        Self::load(file.providers)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, OAuthError> {
        let path = path.as_ref();
        let raw = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(OAuthError::Configuration(format!(
                    "credentials file not found: {}",
                    path.display()
                )));
            }
            Err(err) => return Err(OAuthError::Io(err.to_string())),
        };
        Self::from_toml_str(&raw)
    }

    /// Load from `OAUTH_<PROVIDER>_<FIELD>` environment variables (after `.env`).
    pub fn from_env() -> Result<Self, OAuthError> {
        let _ = dotenvy::dotenv();
        Self::from_vars(std::env::vars())
    }

    /// Load from an explicit set of `OAUTH_<PROVIDER>_<FIELD>` variables.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, OAuthError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let re = ENV_VAR_RE.get_or_init(|| {
            Regex::new(ENV_PREFIX_PATTERN).expect("env var pattern is a valid regex")
        });
        let mut entries: BTreeMap<String, ProviderEntry> = BTreeMap::new();
        for (name, value) in vars {
            let Some(caps) = re.captures(name.as_ref()) else {
                continue;
            };
            let provider = caps[1].to_ascii_lowercase();
            let value = value.into();
            let entry = entries.entry(provider).or_default();
            match &caps[2] {
                "KEY" => entry.key = Some(value),
                "SECRET" => entry.secret = Some(value),
                "PROTOCOL" => entry.protocol = Some(value),
                "AUTHORIZE_URL" => entry.authorize_url = Some(value),
                "TOKEN_URL" => entry.token_url = Some(value),
                "REQUEST_TOKEN_URL" => entry.request_token_url = Some(value),
                "SCOPES" => {
                    entry.scopes = Some(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|scope| !scope.is_empty())
                            .map(str::to_string)
                            .collect(),
                    )
                }
                _ => {}
            }
        }
        Self::load(entries)
    }

    pub fn get(&self, provider_name: &str) -> Option<&Arc<ProviderConfig>> {
        self.providers.get(&normalize_name(provider_name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ProviderConfig>> {
        self.providers.values()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub(crate) fn into_providers(self) -> impl Iterator<Item = (String, Arc<ProviderConfig>)> {
        self.providers.into_iter()
    }
}

fn validate_entry(raw_name: &str, entry: ProviderEntry) -> Result<ProviderConfig, OAuthError> {
    let name = normalize_name(raw_name);
    if name.is_empty() {
        return Err(OAuthError::Configuration(
            "provider name must not be empty".to_string(),
        ));
    }
    let key = required(&name, "key", entry.key)?;
    let secret = required(&name, "secret", entry.secret)?;
    let builtin = catalog::lookup(&name);

    let protocol = match entry.protocol.as_deref().map(str::trim) {
        Some(raw) => raw.parse::<ProtocolVariant>().map_err(|_| {
            OAuthError::Configuration(format!(
                "provider '{name}' names unsupported protocol '{raw}' (supported: oauth1, oauth2)"
            ))
        })?,
        None => builtin
            .map(|entry| entry.protocol)
            .unwrap_or(ProtocolVariant::OAuth2),
    };

    let authorize_url = endpoint(
        &name,
        "authorize_url",
        entry.authorize_url,
        builtin.map(|b| b.authorize_url),
    )?;
    let token_url = endpoint(
        &name,
        "token_url",
        entry.token_url,
        builtin.map(|b| b.token_url),
    )?;
    let request_token_url = match entry
        .request_token_url
        .or_else(|| builtin.and_then(|b| b.request_token_url).map(str::to_string))
    {
        Some(raw) => Some(parse_url(&name, "request_token_url", &raw)?),
        None => None,
    };

    let scopes = entry.scopes.unwrap_or_else(|| {
        builtin
            .map(|b| b.default_scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default()
    });

    Ok(ProviderConfig {
        name,
        protocol,
        key,
        secret,
        authorize_url,
        token_url,
        request_token_url,
        scopes,
    })
}

fn required(provider: &str, field: &str, value: Option<String>) -> Result<String, OAuthError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(OAuthError::Configuration(format!(
            "provider '{provider}' is missing required field '{field}'"
        ))),
    }
}

fn endpoint(
    provider: &str,
    field: &str,
    configured: Option<String>,
    builtin: Option<&'static str>,
) -> Result<Url, OAuthError> {
    match configured.as_deref().or(builtin) {
        Some(raw) => parse_url(provider, field, raw),
        None => Err(OAuthError::Configuration(format!(
            "provider '{provider}' has no '{field}' and is not a built-in provider"
        ))),
    }
}

fn parse_url(provider: &str, field: &str, raw: &str) -> Result<Url, OAuthError> {
    Url::parse(raw.trim()).map_err(|err| {
        OAuthError::Configuration(format!("provider '{provider}' has invalid {field}: {err}"))
    })
}
