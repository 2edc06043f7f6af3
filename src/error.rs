//! Error types for configuration resolution
//!
//! Resolution failures abort the current pass and surface to the caller, which
//! retries on its own schedule. Version probe failures never reach the caller as
//! errors; the upgrade decider turns them into an undetermined outcome.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to load default configuration from {path}: {message}")]
    LoadError { path: String, message: String },

    #[error("Secret store error: {0}")]
    SecretStoreError(#[source] kube::Error),

    #[error("Failed to deserialize custom resource overrides: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Version probe error: {0}")]
    VersionProbeError(String),

    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Whether retrying the same resolution later can succeed without a user change
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Error::SecretStoreError(_) | Error::KubeError(_) | Error::VersionProbeError(_)
        )
    }

    pub(crate) fn load(path: impl Into<String>, message: impl ToString) -> Self {
        Error::LoadError {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
