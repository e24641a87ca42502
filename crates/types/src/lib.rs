#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for curie
//!
//! This crate provides the value types shared by the exchange client, the
//! asset cache and the CLI: validated product keys, the API credential and
//! the resolved product handed back to callers.

pub mod credential;
pub mod key;
pub mod product;

// Re-export commonly used types
pub use credential::ApiKey;
pub use key::{ProductKey, MAX_KEY_LEN};
pub use product::{AssetOrigin, Product};
