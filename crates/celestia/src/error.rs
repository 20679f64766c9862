//! Error types.
//!
//! Nothing a controller does at runtime is fatal. Storage failures are
//! caught and logged inside the theme manager, a failed validation is a
//! [`FieldState`](crate::validation::FieldState) rather than an error, and a
//! declarative reference to a missing element is a silent no-op. The types
//! here cover the remaining cases: reading and writing the preference store,
//! and loading configuration.
//!
//! # Recovery Strategies
//!
//! | Error | Where it surfaces | Recovery |
//! |-------|-------------------|----------|
//! | [`StorageError::Unavailable`] | [`PreferenceStore`](crate::storage::PreferenceStore) | Fall back to the default preference, keep state in memory |
//! | [`StorageError::WriteRejected`] | [`PreferenceStore`](crate::storage::PreferenceStore) | Keep the in-memory preference, try again on the next change |
//! | [`ConfigError`] | [`CelestiaConfig`](crate::config::CelestiaConfig), [`ValidationEngine::new`](crate::validation::ValidationEngine::new) | Fix the configuration, or use the defaults |

use thiserror::Error;

/// Errors raised by a [`PreferenceStore`](crate::storage::PreferenceStore).
///
/// Stores the message as a `String` rather than the backend error so the
/// type stays `Clone` and `PartialEq`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backing store cannot be reached at all (private browsing,
    /// disabled storage, sandboxed iframe).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// The store exists but refused the write (quota exceeded).
    #[error("storage write rejected: {0}")]
    WriteRejected(String),
}

impl StorageError {
    /// Creates an [`Unavailable`](StorageError::Unavailable) error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Creates a [`WriteRejected`](StorageError::WriteRejected) error.
    pub fn write_rejected(message: impl Into<String>) -> Self {
        Self::WriteRejected(message.into())
    }
}

/// Errors loading or applying configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// The configured email pattern is not a valid regular expression.
    #[error("invalid email pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Creates an [`Invalid`](ConfigError::Invalid) error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// A specialized [`Result`] type for celestia setup operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
