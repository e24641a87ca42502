use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::FailureContext;

/// Signed URL exchange and transfer events
///
/// Signed URLs carry credentials in their query string, so events only ever
/// name the host serving the asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    /// The API issued a signed URL for a product
    SignedUrlIssued { key: String, host: String },

    /// Transfer started
    Started { key: String, host: String },

    /// Transfer finished and the body was fully written
    Completed {
        key: String,
        bytes: u64,
        elapsed: Duration,
    },

    /// Exchange or transfer failed
    Failed {
        key: String,
        failure: FailureContext,
    },

    /// A failed resolution is being retried by the caller
    Retrying {
        key: String,
        attempt: usize,
        max_attempts: usize,
        backoff: Duration,
        reason: String,
    },
}

impl DownloadEvent {
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::SignedUrlIssued { key, .. }
            | Self::Started { key, .. }
            | Self::Completed { key, .. }
            | Self::Failed { key, .. }
            | Self::Retrying { key, .. } => key,
        }
    }
}
