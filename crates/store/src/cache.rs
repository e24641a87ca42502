//! Resolve product keys to local asset files

use crate::flight::{Attach, FlightTable};
use crate::layout::CacheLayout;
use curie_errors::{Error, NetworkError, StorageError};
use curie_events::{
    AppEvent, CacheEvent, DownloadEvent, EventEmitter, EventSender, FailureContext,
};
use curie_net::AssetSource;
use curie_types::{AssetOrigin, Product, ProductKey};
use futures::FutureExt;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Local cache of product assets backed by an `AssetSource`
///
/// A hit is answered from disk alone. A miss runs one fetch per key no matter
/// how many callers ask concurrently: exchange for a signed URL, stream the
/// body into a hidden temporary file next to the final path, then rename it
/// into place. Readers therefore see either no file or a complete one.
///
/// Share it across tasks behind an `Arc`.
pub struct AssetCache {
    fetcher: Fetcher,
    flights: FlightTable,
}

/// The parts of the cache a fetch needs; owned by the fetch so it can keep
/// running while any caller is still attached
#[derive(Clone)]
struct Fetcher {
    layout: CacheLayout,
    source: Arc<dyn AssetSource>,
    events: Option<EventSender>,
}

impl EventEmitter for Fetcher {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

impl EventEmitter for AssetCache {
    fn event_sender(&self) -> Option<&EventSender> {
        self.fetcher.events.as_ref()
    }
}

impl AssetCache {
    #[must_use]
    pub fn new(layout: CacheLayout, source: Arc<dyn AssetSource>) -> Self {
        Self {
            fetcher: Fetcher {
                layout,
                source,
                events: None,
            },
            flights: FlightTable::default(),
        }
    }

    /// Report cache activity on `tx`
    #[must_use]
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.fetcher.events = Some(tx);
        self
    }

    #[must_use]
    pub fn layout(&self) -> &CacheLayout {
        &self.fetcher.layout
    }

    /// Resolve `key` to a local file, downloading it on a miss
    ///
    /// Callers that ask for a key whose fetch is already running share that
    /// fetch and its outcome, failures included. Dropping the returned future
    /// detaches this caller; the fetch itself is cancelled only once no
    /// caller remains.
    ///
    /// # Errors
    ///
    /// - `ExchangeFailed` if no signed URL could be obtained
    /// - `DownloadFailed` if the transfer failed or did not answer 200
    /// - `Storage` if the cache directory or temporary file could not be
    ///   written or the final rename failed
    ///
    /// On any error no file is left at the final path by this call.
    pub async fn resolve(&self, key: &ProductKey) -> Result<Product, Error> {
        if let Some(product) = self.lookup(key).await? {
            self.emit_cache_hit(key.as_str(), product.path.clone());
            return Ok(product);
        }

        let fetcher = self.fetcher.clone();
        let owned = key.clone();
        let shared = match self
            .flights
            .join_or_start(key, move || fetcher.run(owned).boxed())
        {
            Attach::Started(shared) => {
                self.emit(AppEvent::Cache(CacheEvent::Miss {
                    key: key.to_string(),
                }));
                shared
            }
            Attach::Joined(shared) => {
                self.emit(AppEvent::Cache(CacheEvent::Joined {
                    key: key.to_string(),
                }));
                shared
            }
        };

        shared.await
    }

    /// Validate `key` and resolve it
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` for an unsafe key, otherwise as [`Self::resolve`].
    pub async fn resolve_str(&self, key: &str) -> Result<Product, Error> {
        let key = ProductKey::new(key)?;
        self.resolve(&key).await
    }

    /// The cached asset for `key`, without touching the network
    ///
    /// # Errors
    ///
    /// Returns a storage error if the cache directory cannot be inspected.
    pub async fn lookup(&self, key: &ProductKey) -> Result<Option<Product>, Error> {
        Ok(self
            .fetcher
            .layout
            .existing(key)
            .await?
            .map(|path| Product::new(key.clone(), path, AssetOrigin::Cached)))
    }

    /// Delete the cached asset for `key`
    ///
    /// Returns whether a file was removed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file exists but cannot be deleted.
    pub async fn remove(&self, key: &ProductKey) -> Result<bool, Error> {
        let path = self.fetcher.layout.asset_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                self.emit(AppEvent::Cache(CacheEvent::Removed {
                    key: key.to_string(),
                    path,
                }));
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::from_io_with_path(&e, &path).into()),
        }
    }

    /// All cached assets, sorted by key
    ///
    /// Files whose names are not `<valid key>.<ext>` are ignored. A missing
    /// cache directory is an empty cache.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the cache directory cannot be read.
    pub async fn list(&self) -> Result<Vec<Product>, Error> {
        let layout = &self.fetcher.layout;
        let mut products = Vec::new();

        for (name, path) in regular_files(layout.root()).await? {
            if let Some(key) = layout.key_for(&name) {
                products.push(Product::new(key, path, AssetOrigin::Cached));
            }
        }

        products.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(products)
    }

    /// Delete temporary files left behind by interrupted processes
    ///
    /// Temporary files of fetches running in this cache are kept. Returns the
    /// number of files removed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the cache directory cannot be read or a
    /// leftover file cannot be deleted.
    pub async fn clean_partials(&self) -> Result<usize, Error> {
        let busy = self.flights.keys();
        let mut removed = 0;

        for (name, path) in regular_files(self.fetcher.layout.root()).await? {
            if !CacheLayout::is_partial(&name) {
                continue;
            }
            if let Some(key) = busy
                .iter()
                .find(|key| CacheLayout::is_partial_for(&name, key))
            {
                self.emit_warning_with_context(
                    format!("kept partial download {name}"),
                    format!("fetch for {key} is still running"),
                );
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                // Raced with the owning process committing or cleaning up
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::from_io_with_path(&e, &path).into()),
            }
        }

        self.emit(AppEvent::Cache(CacheEvent::PartialsCleaned { removed }));
        Ok(removed)
    }

    /// Number of keys with a fetch currently running
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }
}

impl Fetcher {
    async fn run(self, key: ProductKey) -> Result<Product, Error> {
        let result = self.fetch(&key).await;
        if let Err(err) = &result {
            self.emit_cache_failed(key.as_str(), FailureContext::from_error(err));
        }
        result
    }

    async fn fetch(&self, key: &ProductKey) -> Result<Product, Error> {
        // Another fetch may have committed since the caller checked
        if let Some(path) = self.layout.existing(key).await? {
            self.emit_cache_hit(key.as_str(), path.clone());
            return Ok(Product::new(key.clone(), path, AssetOrigin::Cached));
        }

        let url = self
            .source
            .signed_url(key)
            .await
            .map_err(|e| attribute(e, |source| Error::exchange(key.as_str(), source)))?;
        let host = url.host_str().unwrap_or_default().to_string();
        self.emit(AppEvent::Download(DownloadEvent::SignedUrlIssued {
            key: key.to_string(),
            host: host.clone(),
        }));

        // The temporary file must sit on the same filesystem as the final
        // path for the rename to be atomic
        self.layout.ensure_root().await?;
        let (file, temp_path) = self.layout.temp_file(key)?.into_parts();
        let mut file = tokio::fs::File::from_std(file);

        self.emit_download_started(key.as_str(), host);
        let started = Instant::now();
        let bytes = self
            .source
            .download(&url, &mut file)
            .await
            .map_err(|e| attribute(e, |source| Error::download(key.as_str(), source)))
            .inspect_err(|err| {
                self.emit(AppEvent::Download(DownloadEvent::Failed {
                    key: key.to_string(),
                    failure: FailureContext::from_error(err),
                }));
            })?;
        file.sync_all()
            .await
            .map_err(|e| StorageError::from_io_with_path(&e, &temp_path))?;
        drop(file);
        self.emit_download_completed(key.as_str(), bytes, started.elapsed());

        let path = self.layout.asset_path(key);
        temp_path
            .persist(&path)
            .map_err(|e| rename_failed(&path, &e.error))?;
        self.emit(AppEvent::Cache(CacheEvent::Committed {
            key: key.to_string(),
            path: path.clone(),
            bytes,
        }));

        Ok(Product::new(key.clone(), path, AssetOrigin::Downloaded))
    }
}

/// Tie a bare network failure to the step and key it happened for
fn attribute(err: Error, wrap: impl FnOnce(NetworkError) -> Error) -> Error {
    match err {
        Error::Network(source) => wrap(source),
        other => other,
    }
}

fn rename_failed(path: &Path, err: &std::io::Error) -> StorageError {
    StorageError::AtomicRenameFailed {
        message: format!("{}: {err}", path.display()),
    }
}

/// Names and paths of the regular files directly under `dir`
async fn regular_files(dir: &Path) -> Result<Vec<(String, std::path::PathBuf)>, Error> {
    let io_err = |e: &std::io::Error| -> Error { StorageError::from_io_with_path(e, dir).into() };

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_err(&e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| io_err(&e))? {
        if !entry.file_type().await.map_err(|e| io_err(&e))?.is_file() {
            continue;
        }
        // Non UTF-8 names can never be keys or our temporary files
        if let Ok(name) = entry.file_name().into_string() {
            files.push((name, entry.path()));
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::io::AsyncWrite;
    use url::Url;

    /// Fails every call; reaching it means the fetch went to the network
    struct Unreachable;

    #[async_trait]
    impl AssetSource for Unreachable {
        async fn signed_url(&self, _key: &ProductKey) -> Result<Url, Error> {
            Err(NetworkError::Transport {
                message: "unexpected exchange".to_string(),
            }
            .into())
        }

        async fn download(
            &self,
            _url: &Url,
            _sink: &mut (dyn AsyncWrite + Send + Unpin),
        ) -> Result<u64, Error> {
            Err(NetworkError::Transport {
                message: "unexpected download".to_string(),
            }
            .into())
        }
    }

    #[tokio::test]
    async fn test_recheck_reports_hit() {
        let dir = tempfile::tempdir().unwrap();
        let layout = CacheLayout::new(dir.path(), "usdz");
        let key = ProductKey::new("abc").unwrap();
        std::fs::write(layout.asset_path(&key), b"committed by another fetch").unwrap();

        let (tx, mut rx) = curie_events::channel();
        let fetcher = Fetcher {
            layout,
            source: Arc::new(Unreachable),
            events: Some(tx),
        };

        let product = fetcher.run(key.clone()).await.unwrap();
        assert_eq!(product.origin, AssetOrigin::Cached);

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            AppEvent::Cache(CacheEvent::Hit { ref key, .. }) if key == "abc"
        ));
        assert!(rx.try_recv().is_err());
    }
}
