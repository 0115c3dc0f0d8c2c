//! Error types for oauth-factory.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all factory, store and checker operations.
#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Token refresh failed: {0}")]
    RefreshFailure(String),

    #[error("Expired or invalid grant")]
    InvalidGrant,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl OAuthError {
    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::UnknownProvider(_) | Self::InvalidArgument(_) | Self::Unsupported(_) => {
                ErrorCategory::Client
            }
            Self::InvalidGrant | Self::RefreshFailure(_) => ErrorCategory::Authentication,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::InvalidResponse(_) => ErrorCategory::Provider,
            Self::Io(_) | Self::Serialization(_) => ErrorCategory::Storage,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::Timeout
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Client => RecoverySuggestion::CheckProviderName,
            ErrorCategory::Authentication => RecoverySuggestion::Reauthenticate,
            ErrorCategory::Network => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Provider | ErrorCategory::Storage => RecoverySuggestion::ContactSupport,
        }
    }
}

impl From<reqwest::Error> for OAuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<std::io::Error> for OAuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for OAuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for OAuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for OAuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<url::ParseError> for OAuthError {
    fn from(error: url::ParseError) -> Self {
        Self::InvalidArgument(format!("invalid URL: {error}"))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, OAuthError>;
