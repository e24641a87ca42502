use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::FailureContext;

/// Asset cache events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CacheEvent {
    /// Asset file already present; no network traffic
    Hit { key: String, path: PathBuf },

    /// Asset absent; this caller launched the fetch
    Miss { key: String },

    /// Asset absent; this caller attached to a fetch already in flight
    Joined { key: String },

    /// Downloaded file renamed into its final place
    Committed {
        key: String,
        path: PathBuf,
        bytes: u64,
    },

    /// Resolution failed; no file was committed
    Failed {
        key: String,
        failure: FailureContext,
    },

    /// Cached asset deleted on request
    Removed { key: String, path: PathBuf },

    /// Leftover temporary files swept from the cache directory
    PartialsCleaned { removed: usize },
}

impl CacheEvent {
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Hit { key, .. }
            | Self::Miss { key }
            | Self::Joined { key }
            | Self::Committed { key, .. }
            | Self::Failed { key, .. }
            | Self::Removed { key, .. } => Some(key),
            Self::PartialsCleaned { .. } => None,
        }
    }
}
