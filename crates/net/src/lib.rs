#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Network operations for curie
//!
//! This crate handles the signed URL exchange, streaming asset downloads and
//! the shared pooled HTTP client. Nothing here retries; failures come back
//! typed so callers can decide.

mod client;
mod download;
mod exchange;
mod source;

pub use client::{redact, NetClient, NetConfig};
pub use download::stream_to;
pub use exchange::{parse_signed_url, SignedUrlExchange, API_KEY_HEADER, PRODUCT_ID_PARAM};
pub use source::{AssetSource, RemoteSource};
