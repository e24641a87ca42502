//! Streaming asset download

use crate::client::{map_transport_error, NetClient};
use curie_errors::{Error, NetworkError, StorageError};
use futures::StreamExt;
use reqwest::StatusCode;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use url::Url;

/// Validate the HTTP response for a download
///
/// Only `200 OK` carries a full asset body; anything else, including other
/// 2xx codes, is rejected.
pub(crate) fn validate_response(response: &reqwest::Response) -> Result<(), NetworkError> {
    let status = response.status();
    if status != StatusCode::OK {
        return Err(NetworkError::HttpError {
            status: status.as_u16(),
            message: status.to_string(),
        });
    }
    Ok(())
}

/// GET `url` and stream the body into `sink`
///
/// Returns the number of bytes written. The sink is flushed before returning;
/// committing it anywhere is up to the caller.
///
/// # Errors
///
/// Network failures and non-200 statuses are `Error::Network`. Failures
/// writing into `sink` are `Error::Storage`.
pub async fn stream_to(
    client: &NetClient,
    url: &Url,
    sink: &mut (dyn AsyncWrite + Send + Unpin),
) -> Result<u64, Error> {
    let response = client.get(url).await?;
    validate_response(&response)?;

    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_transport_error)?;
        sink.write_all(&chunk).await.map_err(StorageError::from)?;
        written += chunk.len() as u64;
    }

    sink.flush().await.map_err(StorageError::from)?;
    Ok(written)
}
