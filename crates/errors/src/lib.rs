#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for curie
//!
//! This crate provides fine-grained error types organized by domain.
//! Every error type is `Clone` so that a single in-flight resolution can hand
//! the same failure to every caller attached to it.

use std::borrow::Cow;

use thiserror::Error;

pub mod config;
pub mod key;
pub mod network;
pub mod storage;

// Re-export all error types at the root
pub use config::ConfigError;
pub use key::KeyError;
pub use network::NetworkError;
pub use storage::StorageError;

/// Generic error type for cross-crate boundaries
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("invalid product key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("signed URL exchange failed for {key}: {source}")]
    ExchangeFailed {
        key: String,
        #[source]
        source: NetworkError,
    },

    #[error("download failed for {key}: {source}")]
    DownloadFailed {
        key: String,
        #[source]
        source: NetworkError,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Wrap a failure of the signed URL exchange with the key it was issued for
    #[must_use]
    pub fn exchange(key: impl Into<String>, source: NetworkError) -> Self {
        Self::ExchangeFailed {
            key: key.into(),
            source,
        }
    }

    /// Wrap a failure of the asset download with the key it was issued for
    #[must_use]
    pub fn download(key: impl Into<String>, source: NetworkError) -> Self {
        Self::DownloadFailed {
            key: key.into(),
            source,
        }
    }

    /// The network-level cause, if this error has one
    #[must_use]
    pub fn network_cause(&self) -> Option<&NetworkError> {
        match self {
            Self::Network(err)
            | Self::ExchangeFailed { source: err, .. }
            | Self::DownloadFailed { source: err, .. } => Some(err),
            _ => None,
        }
    }
}

/// Filesystem failures without a known path are still storage failures
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(StorageError::from(err))
    }
}

/// Result type alias for curie operations
pub type Result<T> = std::result::Result<T, Error>;

/// Minimal interface for rendering user-facing error information without
/// requiring heavyweight envelopes.
pub trait UserFacingError {
    /// Short message suitable for CLI output.
    fn user_message(&self) -> Cow<'_, str>;

    /// Optional remediation hint.
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Whether retrying the same operation is likely to succeed.
    fn is_retryable(&self) -> bool {
        false
    }

    /// Stable error code for analytics / structured reporting.
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::InvalidKey(err) => err.user_hint(),
            Error::Network(err)
            | Error::ExchangeFailed { source: err, .. }
            | Error::DownloadFailed { source: err, .. } => err.user_hint(),
            Error::Storage(err) => err.user_hint(),
            Error::Config(err) => err.user_hint(),
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(err)
            | Error::ExchangeFailed { source: err, .. }
            | Error::DownloadFailed { source: err, .. } => err.is_retryable(),
            Error::Storage(err) => err.is_retryable(),
            Error::InvalidKey(_) | Error::Config(_) => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::InvalidKey(err) => err.user_code(),
            Error::Network(err) => err.user_code(),
            Error::ExchangeFailed { .. } => Some("exchange.failed"),
            Error::DownloadFailed { .. } => Some("download.failed"),
            Error::Storage(err) => err.user_code(),
            Error::Config(err) => err.user_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_cause_reaches_wrapped_source() {
        let err = Error::exchange(
            "abc",
            NetworkError::Decoding {
                message: "missing field `url`".into(),
            },
        );
        assert!(matches!(
            err.network_cause(),
            Some(NetworkError::Decoding { .. })
        ));
        assert!(Error::from(KeyError::Empty).network_cause().is_none());
    }

    #[test]
    fn test_retryable_follows_cause() {
        let transient = Error::download(
            "abc",
            NetworkError::Timeout {
                url: "https://cdn.example/a.usdz".into(),
            },
        );
        assert!(transient.is_retryable());

        let permanent = Error::download(
            "abc",
            NetworkError::HttpError {
                status: 404,
                message: "Not Found".into(),
            },
        );
        assert!(!permanent.is_retryable());
    }

    #[test]
    fn test_bare_io_error_is_storage_failure() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "sink closed");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Storage(StorageError::IoError { .. })));
        assert_eq!(err.user_code(), Some("storage.io_error"));
    }
}
