//! Resolved product returned by the asset cache

use crate::ProductKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// How a resolution obtained its file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetOrigin {
    /// The file was already in the cache
    Cached,
    /// The file was downloaded and installed by this resolution
    Downloaded,
}

impl fmt::Display for AssetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cached => write!(f, "cached"),
            Self::Downloaded => write!(f, "downloaded"),
        }
    }
}

/// A product asset resolved to a local file
///
/// Built fresh on every successful resolution and owned by the caller; the
/// cache never stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub key: ProductKey,
    /// Local path of the asset file
    pub path: PathBuf,
    /// When this resolution completed
    pub resolved_at: DateTime<Utc>,
    pub origin: AssetOrigin,
}

impl Product {
    /// Create a product stamped with the current time
    #[must_use]
    pub fn new(key: ProductKey, path: PathBuf, origin: AssetOrigin) -> Self {
        Self {
            key,
            path,
            resolved_at: Utc::now(),
            origin,
        }
    }
}
