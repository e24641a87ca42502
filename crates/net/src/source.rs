//! Where asset bytes come from

use crate::client::NetClient;
use crate::download::stream_to;
use crate::exchange::SignedUrlExchange;
use async_trait::async_trait;
use curie_errors::Error;
use curie_types::ProductKey;
use tokio::io::AsyncWrite;
use url::Url;

/// Source of product assets
///
/// The asset cache talks only to this trait, so tests and alternative
/// transports can stand in for the HTTP implementation.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Obtain a download URL for `key`
    ///
    /// # Errors
    ///
    /// Returns `Error::Network` describing why no URL could be obtained.
    async fn signed_url(&self, key: &ProductKey) -> Result<Url, Error>;

    /// Write the asset at `url` into `sink`, returning the byte count
    ///
    /// # Errors
    ///
    /// Returns `Error::Network` for transfer failures and `Error::Storage`
    /// when `sink` rejects a write.
    async fn download(
        &self,
        url: &Url,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, Error>;
}

/// HTTP asset source: signed URL exchange plus a streaming GET
#[derive(Debug, Clone)]
pub struct RemoteSource {
    exchange: SignedUrlExchange,
    client: NetClient,
}

impl RemoteSource {
    /// Download requests reuse the exchange's connection pool
    #[must_use]
    pub fn new(exchange: SignedUrlExchange, client: NetClient) -> Self {
        Self { exchange, client }
    }
}

#[async_trait]
impl AssetSource for RemoteSource {
    async fn signed_url(&self, key: &ProductKey) -> Result<Url, Error> {
        self.exchange.exchange(key).await
    }

    async fn download(
        &self,
        url: &Url,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, Error> {
        stream_to(&self.client, url, sink).await
    }
}
