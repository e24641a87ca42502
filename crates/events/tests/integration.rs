//! Integration tests for events

#[cfg(test)]
mod tests {
    use curie_errors::{Error, NetworkError};
    use curie_events::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_event_emitter() {
        let (tx, mut rx) = channel();

        tx.emit_warning_with_context("partial file kept", "fetch in progress");
        tx.emit_operation_completed("fetch", true);

        let event1 = rx.recv().await.unwrap();
        assert!(matches!(
            &event1,
            AppEvent::General(GeneralEvent::Warning { context: Some(c), .. }) if c == "fetch in progress"
        ));
        assert_eq!(event1.log_level(), tracing::Level::WARN);

        let event2 = rx.recv().await.unwrap();
        assert!(matches!(
            event2,
            AppEvent::General(GeneralEvent::OperationCompleted { success: true, .. })
        ));
    }

    #[tokio::test]
    async fn test_dropped_receiver() {
        let (tx, rx) = channel();
        drop(rx);

        // Should not panic when receiver is dropped
        tx.emit_cache_hit("abc", std::path::PathBuf::from("/tmp/abc.usdz"));
    }

    #[test]
    fn test_log_levels() {
        let failure = FailureContext::from_error(&Error::download(
            "abc",
            NetworkError::HttpError {
                status: 403,
                message: "Forbidden".to_string(),
            },
        ));
        assert_eq!(failure.code.as_deref(), Some("download.failed"));

        let failed = AppEvent::Cache(CacheEvent::Failed {
            key: "abc".to_string(),
            failure,
        });
        assert_eq!(failed.log_level(), tracing::Level::ERROR);
        assert_eq!(failed.log_target(), "curie::events::cache");
        assert_eq!(failed.key(), Some("abc"));

        let joined = AppEvent::Cache(CacheEvent::Joined {
            key: "abc".to_string(),
        });
        assert_eq!(joined.log_level(), tracing::Level::DEBUG);

        let completed = AppEvent::Download(DownloadEvent::Completed {
            key: "abc".to_string(),
            bytes: 4,
            elapsed: Duration::from_millis(10),
        });
        assert_eq!(completed.log_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_event_serialization() {
        let event = AppEvent::Cache(CacheEvent::PartialsCleaned { removed: 2 });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["domain"], "cache");
        assert_eq!(json["event"]["type"], "PartialsCleaned");
        assert_eq!(json["event"]["removed"], 2);
    }
}
