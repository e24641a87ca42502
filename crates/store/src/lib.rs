#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Local asset cache for curie
//!
//! This crate manages a flat directory of downloaded product assets, one
//! file per product key. Assets are fetched through an `AssetSource`, written
//! to a hidden temporary file and renamed into place, so a visible asset file
//! is always complete. Concurrent requests for the same key share one fetch.

mod cache;
mod flight;
mod layout;

pub use cache::AssetCache;
pub use layout::{CacheLayout, PARTIAL_SUFFIX};
