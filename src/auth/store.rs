use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use super::token::{Token, TokenKey};
use crate::error::OAuthError;

const TOKEN_FILE_VERSION: u32 = 1;

/// Storage abstraction for session-scoped OAuth tokens.
///
/// Writes are last-writer-wins. Implementations must allow concurrent access
/// to different keys.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: &TokenKey) -> Result<Option<Token>, OAuthError>;
    async fn put(&self, key: &TokenKey, token: &Token) -> Result<(), OAuthError>;
    async fn delete(&self, key: &TokenKey) -> Result<(), OAuthError>;
}

/// Process-lifetime token store, the in-memory stand-in for a server-side session.
///
/// Backed by a sharded map, so operations on different keys do not share a lock.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: DashMap<TokenKey, Token>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, key: &TokenKey) -> Result<Option<Token>, OAuthError> {
        Ok(self.tokens.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &TokenKey, token: &Token) -> Result<(), OAuthError> {
        self.tokens.insert(key.clone(), token.clone());
        Ok(())
    }

    async fn delete(&self, key: &TokenKey) -> Result<(), OAuthError> {
        self.tokens.remove(key);
        Ok(())
    }
}

/// Configuration for file-backed token storage.
#[derive(Debug, Clone)]
pub struct TokenStoreConfig {
    pub base_dir: PathBuf,
}

impl TokenStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_dir() -> PathBuf {
        crate::config::default_token_dir()
    }
}

/// File-backed token store using one TOML file per (provider, session).
///
/// Survives process restarts. Files are written atomically and, on unix,
/// readable only by the owner.
///
/// # Example
/// ```no_run
/// use oauth_factory::auth::{FileTokenStore, Token, TokenKey, TokenStore};
///
/// # async fn example() -> oauth_factory::error::Result<()> {
/// let store = FileTokenStore::new_default();
/// let token = Token::new("access", "github", "sess1");
/// store.put(&token.key(), &token).await?;
/// let loaded = store.get(&TokenKey::new("sess1", "github")).await?;
/// assert_eq!(loaded, Some(token));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    base_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(config: TokenStoreConfig) -> Self {
        Self {
            base_dir: config.base_dir,
        }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: TokenStoreConfig::default_dir(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn token_path(&self, key: &TokenKey) -> PathBuf {
        let provider = normalize_label(&key.provider);
        // Session ids are caller-controlled; encode them so they cannot escape the directory.
        let session = URL_SAFE_NO_PAD.encode(key.session_id.as_bytes());
        self.base_dir.join(provider).join(format!("{session}.toml"))
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, key: &TokenKey) -> Result<Option<Token>, OAuthError> {
        let path = self.token_path(key);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(OAuthError::Io(err.to_string())),
        };
        let file: TokenFile = toml::from_str(&raw)?;
        if file.version != TOKEN_FILE_VERSION {
            return Err(OAuthError::Serialization(format!(
                "unsupported token file version {} at {}",
                file.version,
                path.display()
            )));
        }
        Ok(Some(file.token))
    }

    async fn put(&self, key: &TokenKey, token: &Token) -> Result<(), OAuthError> {
        let path = self.token_path(key);
        let file = TokenFile {
            version: TOKEN_FILE_VERSION,
            saved_at: Utc::now(),
            token: token.clone(),
        };
        let serialized = toml::to_string(&file)?;
        tokio::task::spawn_blocking(move || atomic_write(&path, serialized.as_bytes()))
            .await
            .map_err(|err| OAuthError::Io(format!("token write task failed: {err}")))?
    }

    async fn delete(&self, key: &TokenKey) -> Result<(), OAuthError> {
        let path = self.token_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(OAuthError::Io(err.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenFile {
    version: u32,
    saved_at: DateTime<Utc>,
    token: Token,
}

fn normalize_label(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "default".to_string();
    }
    let mut out = String::with_capacity(trimmed.len());
    for ch in trimmed.chars() {
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_alphanumeric() || lower == '-' || lower == '_' {
            out.push(lower);
        } else {
            out.push('-');
        }
    }
    if out.trim_matches('-').is_empty() {
        "default".to_string()
    } else {
        out
    }
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), OAuthError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file_name = path.file_name().ok_or_else(|| {
        OAuthError::Io(format!("token path {} has no file name", path.display()))
    })?;

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let temp_name = format!(
        ".{}.tmp-{}-{nonce}",
        file_name.to_string_lossy(),
        std::process::id()
    );
    let temp_path = path.with_file_name(temp_name);

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let write_result = (|| -> std::io::Result<()> {
        let mut temp_file = options.open(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(err.into());
    }

    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

    Ok(())
}
