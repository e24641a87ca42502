//! Single-flight table
//!
//! At most one fetch per product key runs at a time. Later callers for the
//! same key attach to the running fetch and receive a clone of its result.
//!
//! The table stores only a weak handle to each shared future, so the fetch is
//! owned by the callers awaiting it. When the last of them is dropped the
//! fetch is dropped with it. Each fetch carries a guard that removes its own
//! entry when the fetch finishes or is dropped, whichever comes first.

use curie_errors::Error;
use curie_types::{Product, ProductKey};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, Shared, WeakShared};
use futures::FutureExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type FetchFuture = BoxFuture<'static, Result<Product, Error>>;

/// Handle to an in-flight fetch; cloneable, resolves to the shared result
pub(crate) type SharedFetch = Shared<FetchFuture>;

struct Flight {
    id: u64,
    handle: Option<WeakShared<FetchFuture>>,
}

/// How a caller got its handle
pub(crate) enum Attach {
    /// A new fetch was launched for this caller
    Started(SharedFetch),
    /// The caller joined a fetch that was already running
    Joined(SharedFetch),
}

#[derive(Default)]
pub(crate) struct FlightTable {
    entries: Arc<DashMap<ProductKey, Flight>>,
    next_id: AtomicU64,
}

/// Removes the owning flight's entry when dropped
struct EntryGuard {
    entries: Arc<DashMap<ProductKey, Flight>>,
    key: ProductKey,
    id: u64,
}

impl Drop for EntryGuard {
    fn drop(&mut self) {
        // A newer flight may already own the slot; only remove our own entry
        self.entries.remove_if(&self.key, |_, flight| flight.id == self.id);
    }
}

impl FlightTable {
    /// Join the live fetch for `key`, or launch `start()` as a new one
    ///
    /// `start` is only called when no live fetch exists. Nothing is polled
    /// here; the returned handle drives the fetch when awaited.
    pub(crate) fn join_or_start<F>(&self, key: &ProductKey, start: F) -> Attach
    where
        F: FnOnce() -> FetchFuture,
    {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let live = occupied.get().handle.as_ref().and_then(WeakShared::upgrade);
                if let Some(shared) = live {
                    return Attach::Joined(shared);
                }
                // Every caller of the previous fetch is gone and its guard
                // has not run yet
                let (flight, shared) = self.launch(key, start);
                occupied.insert(flight);
                Attach::Started(shared)
            }
            Entry::Vacant(vacant) => {
                let (flight, shared) = self.launch(key, start);
                vacant.insert(flight);
                Attach::Started(shared)
            }
        }
    }

    fn launch<F>(&self, key: &ProductKey, start: F) -> (Flight, SharedFetch)
    where
        F: FnOnce() -> FetchFuture,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let guard = EntryGuard {
            entries: Arc::clone(&self.entries),
            key: key.clone(),
            id,
        };
        let work = start();
        let shared = async move {
            let _guard = guard;
            work.await
        }
        .boxed()
        .shared();
        // Only None once the future has completed, which an unpolled one has not
        let handle = shared.downgrade();
        (Flight { id, handle }, shared)
    }

    /// Number of keys with a registered fetch
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Keys with a registered fetch
    pub(crate) fn keys(&self) -> Vec<ProductKey> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curie_types::AssetOrigin;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;

    fn key() -> ProductKey {
        ProductKey::new("abc").unwrap()
    }

    fn product() -> Product {
        Product::new(key(), PathBuf::from("/cache/abc.usdz"), AssetOrigin::Downloaded)
    }

    #[tokio::test]
    async fn test_second_caller_joins() {
        let table = FlightTable::default();
        let launches = AtomicUsize::new(0);
        let start = || {
            launches.fetch_add(1, Ordering::SeqCst);
            async { Ok(product()) }.boxed()
        };

        let first = match table.join_or_start(&key(), start) {
            Attach::Started(f) => f,
            Attach::Joined(_) => panic!("first caller must start"),
        };
        let second = match table.join_or_start(&key(), || unreachable!()) {
            Attach::Joined(f) => f,
            Attach::Started(_) => panic!("second caller must join"),
        };
        assert_eq!(table.len(), 1);

        let (a, b) = futures::join!(first, second);
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(launches.load(Ordering::SeqCst), 1);
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn test_dropping_all_callers_clears_entry() {
        let table = FlightTable::default();
        let handle = match table.join_or_start(&key(), || futures::future::pending().boxed()) {
            Attach::Started(f) => f,
            Attach::Joined(_) => unreachable!(),
        };
        assert_eq!(table.len(), 1);
        drop(handle);
        assert_eq!(table.len(), 0);
        assert!(matches!(
            table.join_or_start(&key(), || async { Ok(product()) }.boxed()),
            Attach::Started(_)
        ));
    }

    #[tokio::test]
    async fn test_stale_guard_keeps_newer_entry() {
        let table = FlightTable::default();
        let old_guard = EntryGuard {
            entries: Arc::clone(&table.entries),
            key: key(),
            id: u64::MAX,
        };
        let _live = table.join_or_start(&key(), || futures::future::pending().boxed());
        drop(old_guard);
        assert_eq!(table.len(), 1);
    }
}
