//! Error classification and recovery hints.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    /// The caller asked for something that does not exist (4xx-equivalent).
    Client,
    Authentication,
    Network,
    Timeout,
    Provider,
    Storage,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    CheckConfiguration,
    CheckProviderName,
    Reauthenticate,
    RetryWithBackoff,
    IncreaseTimeout,
    ContactSupport,
}
