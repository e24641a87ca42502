//! Component wiring for the CLI

use crate::error::CliError;
use async_trait::async_trait;
use curie_config::Config;
use curie_errors::{ConfigError, Error};
use curie_events::EventSender;
use curie_net::{AssetSource, NetClient, NetConfig, RemoteSource, SignedUrlExchange};
use curie_store::{AssetCache, CacheLayout};
use curie_types::ProductKey;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tracing::debug;
use url::Url;

/// Build the asset cache described by `config`
///
/// With `online` unset the cache gets a source that refuses to fetch, so
/// local commands work without an API key.
pub fn build_cache(
    config: &Config,
    online: bool,
    events: EventSender,
) -> Result<AssetCache, CliError> {
    let cache_dir = config.cache_dir()?;
    debug!(cache_dir = %cache_dir.display(), online, "Building asset cache");

    let layout = CacheLayout::new(cache_dir, config.cache.extension.clone());
    let source: Arc<dyn AssetSource> = if online {
        Arc::new(remote_source(config)?)
    } else {
        Arc::new(OfflineSource)
    };

    Ok(AssetCache::new(layout, source).with_events(events))
}

fn remote_source(config: &Config) -> Result<RemoteSource, Error> {
    let api_key = config.api_key()?;
    let net_config = NetConfig {
        timeout: config.timeout(),
        connect_timeout: config.connect_timeout(),
        ..NetConfig::default()
    };
    let client = NetClient::new(&net_config)?;
    let exchange = SignedUrlExchange::new(client.clone(), &config.api.endpoint, api_key)?;
    Ok(RemoteSource::new(exchange, client))
}

/// Source for commands that only read the local cache
struct OfflineSource;

impl OfflineSource {
    fn unavailable() -> Error {
        ConfigError::MissingField {
            field: "api.api_key".to_string(),
        }
        .into()
    }
}

#[async_trait]
impl AssetSource for OfflineSource {
    async fn signed_url(&self, _key: &ProductKey) -> Result<Url, Error> {
        Err(Self::unavailable())
    }

    async fn download(
        &self,
        _url: &Url,
        _sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64, Error> {
        Err(Self::unavailable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.cache.dir = Some(dir.to_path_buf());
        config
    }

    #[test]
    fn test_offline_cache_needs_no_key() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = curie_events::channel();
        let cache = build_cache(&config_in(dir.path()), false, tx).unwrap();
        assert_eq!(cache.layout().root(), dir.path());
    }

    #[test]
    fn test_online_cache_requires_key() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = curie_events::channel();
        let err = build_cache(&config_in(dir.path()), true, tx).err().unwrap();
        assert!(matches!(
            err,
            CliError::Ops(Error::Config(ConfigError::MissingField { .. }))
        ));
    }

    #[tokio::test]
    async fn test_offline_source_refuses_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = curie_events::channel();
        let cache = build_cache(&config_in(dir.path()), false, tx).unwrap();
        let key = ProductKey::new("abc").unwrap();
        assert!(cache.resolve(&key).await.is_err());
        assert!(!cache.layout().asset_path(&key).exists());
    }
}
