//! On-disk naming for the asset cache
//!
//! The cache is a single flat directory. A committed asset lives at
//! `<root>/<key>.<ext>`; an in-progress download lives at
//! `<root>/.<key>.<random>.part` until it is renamed into place.

use curie_errors::{Error, StorageError};
use curie_types::ProductKey;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Suffix of temporary download files
pub const PARTIAL_SUFFIX: &str = ".part";

#[derive(Debug, Clone)]
pub struct CacheLayout {
    root: PathBuf,
    extension: String,
}

impl CacheLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Final location of the asset for `key`
    #[must_use]
    pub fn asset_path(&self, key: &ProductKey) -> PathBuf {
        self.root.join(key.file_name(&self.extension))
    }

    /// Path of the committed asset for `key`, if one exists
    ///
    /// Only regular files count; anything else at that path is a miss.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the path cannot be inspected for a reason
    /// other than not existing.
    pub async fn existing(&self, key: &ProductKey) -> Result<Option<PathBuf>, Error> {
        let path = self.asset_path(key);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::from_io_with_path(&e, &path).into()),
        }
    }

    /// Create the cache directory if missing
    ///
    /// # Errors
    ///
    /// Returns a storage error if the directory cannot be created.
    pub async fn ensure_root(&self) -> Result<(), Error> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, &self.root).into())
    }

    /// Create a uniquely named hidden temporary file for `key` inside the root
    ///
    /// The file is deleted when the returned handle (or the `TempPath` split
    /// from it) is dropped without being persisted.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be created.
    pub fn temp_file(&self, key: &ProductKey) -> Result<NamedTempFile, Error> {
        tempfile::Builder::new()
            .prefix(&format!(".{key}."))
            .suffix(PARTIAL_SUFFIX)
            .tempfile_in(&self.root)
            .map_err(|e| StorageError::from_io_with_path(&e, &self.root).into())
    }

    /// Key of a committed asset file name, if it is one
    #[must_use]
    pub fn key_for(&self, file_name: &str) -> Option<ProductKey> {
        let stem = file_name
            .strip_suffix(self.extension.as_str())?
            .strip_suffix('.')?;
        ProductKey::new(stem).ok()
    }

    /// Whether `file_name` looks like a temporary download file
    #[must_use]
    pub fn is_partial(file_name: &str) -> bool {
        file_name.starts_with('.') && file_name.ends_with(PARTIAL_SUFFIX)
    }

    /// Whether `file_name` is a temporary download file for `key`
    #[must_use]
    pub fn is_partial_for(file_name: &str, key: &ProductKey) -> bool {
        Self::is_partial(file_name)
            && file_name[1..]
                .strip_prefix(key.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    }
}
