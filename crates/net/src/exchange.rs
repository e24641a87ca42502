//! Signed URL exchange
//!
//! Trades a product key and the API credential for a short-lived URL from
//! which the asset can be downloaded.

use crate::client::{map_transport_error, NetClient};
use curie_errors::{Error, NetworkError};
use curie_types::{ApiKey, ProductKey};
use serde_json::Value;
use url::Url;

/// Header carrying the API credential
pub const API_KEY_HEADER: &str = "x-curie-api-key";

/// Query parameter naming the product
pub const PRODUCT_ID_PARAM: &str = "product_id";

/// Client for the signed URL endpoint
///
/// Holds no mutable state; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct SignedUrlExchange {
    client: NetClient,
    endpoint: Url,
    api_key: ApiKey,
}

impl SignedUrlExchange {
    /// Create an exchange against `endpoint`
    ///
    /// # Errors
    ///
    /// Returns `NetworkError::InvalidUrl` if the endpoint is not a well-formed
    /// http or https URL. No request is made.
    pub fn new(client: NetClient, endpoint: &str, api_key: ApiKey) -> Result<Self, Error> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| NetworkError::InvalidUrl(format!("{endpoint}: {e}")))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(NetworkError::InvalidUrl(format!(
                "{endpoint}: endpoint must be http or https"
            ))
            .into());
        }
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    /// Build the request URL for `key`
    #[must_use]
    pub fn request_url(&self, key: &ProductKey) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair(PRODUCT_ID_PARAM, key.as_str());
        url
    }

    /// Obtain a signed download URL for `key`
    ///
    /// Issues exactly one request; never retries.
    ///
    /// # Errors
    ///
    /// - transport failure: `Timeout`, `ConnectionRefused` or `Transport`
    /// - non-success status: `HttpError`
    /// - body not a JSON object with a string `url`: `Decoding`
    /// - `url` not an absolute URL: `InvalidUrl`
    pub async fn exchange(&self, key: &ProductKey) -> Result<Url, Error> {
        let response = self
            .client
            .post(
                &self.request_url(key),
                &[(API_KEY_HEADER, self.api_key.expose())],
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::HttpError {
                status: status.as_u16(),
                message: status.to_string(),
            }
            .into());
        }

        let body = response.bytes().await.map_err(map_transport_error)?;
        Ok(parse_signed_url(&body)?)
    }
}

/// Extract the signed URL from an exchange response body
///
/// # Errors
///
/// Returns `Decoding` unless the body is a JSON object whose `url` member is
/// a string, and `InvalidUrl` if that string does not parse as an absolute URL.
pub fn parse_signed_url(body: &[u8]) -> Result<Url, NetworkError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| NetworkError::Decoding {
        message: e.to_string(),
    })?;
    let object = value.as_object().ok_or_else(|| NetworkError::Decoding {
        message: "expected a JSON object".to_string(),
    })?;
    let raw = object
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| NetworkError::Decoding {
            message: "missing string field `url`".to_string(),
        })?;
    Url::parse(raw).map_err(|e| NetworkError::InvalidUrl(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(endpoint: &str) -> Result<SignedUrlExchange, Error> {
        SignedUrlExchange::new(
            NetClient::with_defaults().unwrap(),
            endpoint,
            ApiKey::new("k"),
        )
    }

    #[test]
    fn test_parse_signed_url() {
        let url = parse_signed_url(br#"{"url": "https://cdn.example.com/a.usdz?sig=1"}"#).unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
    }

    #[test]
    fn test_parse_rejects_shapes() {
        for body in [
            &b"not json"[..],
            br#"["https://cdn.example.com/a"]"#,
            br#"{"link": "https://cdn.example.com/a"}"#,
            br#"{"url": 42}"#,
            br#"{"url": null}"#,
        ] {
            assert!(
                matches!(parse_signed_url(body), Err(NetworkError::Decoding { .. })),
                "{}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn test_parse_rejects_relative_url() {
        assert!(matches!(
            parse_signed_url(br#"{"url": "not a url"}"#),
            Err(NetworkError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_endpoint_validation() {
        assert!(exchange("https://api.curie.io/public/products/signurl").is_ok());
        for bad in ["", "api.curie.io/signurl", "ftp://api.curie.io/signurl"] {
            assert!(matches!(
                exchange(bad),
                Err(Error::Network(NetworkError::InvalidUrl(_)))
            ));
        }
    }

    #[test]
    fn test_request_url_carries_product_id() {
        let ex = exchange("https://api.curie.io/public/products/signurl").unwrap();
        let key = ProductKey::new("65a9a1913baa11131f202df8").unwrap();
        assert_eq!(
            ex.request_url(&key).as_str(),
            "https://api.curie.io/public/products/signurl?product_id=65a9a1913baa11131f202df8"
        );
    }
}
