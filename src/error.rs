//! Error types for the page host.

use thiserror::Error;

/// Failures surfaced by the coordinator. This is the only error type the UI
/// layer has to understand; lower layers convert into it.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Broadcast channel capability is unavailable; detached mode is disabled")]
    TransportUnavailable,

    #[error("Detached mode is disabled for this session")]
    DetachedModeDisabled,

    #[error("Tab creation blocked: {0}")]
    TabCreationBlocked(String),

    #[error("Detached tab did not become addressable after {attempts} attempts")]
    HandshakeTimeout { attempts: u32 },

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Store operation failed: {0}")]
    StoreOperationFailed(#[from] StoreError),

    #[error("Preference update failed: {0}")]
    PreferenceFailed(#[from] PreferenceError),

    #[error("Unknown page: {0}")]
    UnknownPage(String),

    #[error("Unknown variable set: {0}")]
    UnknownVariableSet(String),
}

/// Variable-set store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Variable set not found: {0}")]
    NotFound(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Host platform errors (tab creation and friends)
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Popup blocked while opening {0}")]
    PopupBlocked(String),
}

/// Persisted preference errors
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("Preference storage error: {0}")]
    Storage(#[from] sled::Error),
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level error for CLI routes
#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Preference(#[from] PreferenceError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid script: {0}")]
    Script(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
