//! Structured logging integration for events
//!
//! Library crates never log directly. They emit `AppEvent`s and this module
//! turns each one into a tracing record with structured fields.

use curie_events::{AppEvent, CacheEvent, DownloadEvent, GeneralEvent};
use tracing::{debug, error, info, warn};

/// Log an `AppEvent` using the tracing infrastructure with structured fields
pub fn log_event_with_tracing(event: &AppEvent) {
    let source = event.log_target();
    match event {
        AppEvent::General(general) => log_general(source, general),
        AppEvent::Download(download) => log_download(source, download),
        AppEvent::Cache(cache) => log_cache(source, cache),
    }
}

fn log_general(source: &str, event: &GeneralEvent) {
    match event {
        GeneralEvent::Warning { message, context } => {
            warn!(source = source, context = ?context, "{message}");
        }
        GeneralEvent::OperationStarted { operation } => {
            info!(source = source, operation = %operation, "Operation started");
        }
        GeneralEvent::OperationCompleted { operation, success } => {
            info!(
                source = source,
                operation = %operation,
                success = success,
                "Operation completed"
            );
        }
    }
}

fn log_download(source: &str, event: &DownloadEvent) {
    match event {
        DownloadEvent::SignedUrlIssued { key, host } => {
            debug!(source = source, key = %key, host = %host, "Signed URL issued");
        }
        DownloadEvent::Started { key, host } => {
            info!(source = source, key = %key, host = %host, "Download started");
        }
        DownloadEvent::Completed {
            key,
            bytes,
            elapsed,
        } => {
            info!(
                source = source,
                key = %key,
                bytes = bytes,
                elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "Download completed"
            );
        }
        DownloadEvent::Failed { key, failure } => {
            error!(
                source = source,
                key = %key,
                retryable = failure.retryable,
                code = ?failure.code,
                message = %failure.message,
                hint = ?failure.hint,
                "Download failed"
            );
        }
        DownloadEvent::Retrying {
            key,
            attempt,
            max_attempts,
            backoff,
            reason,
        } => {
            warn!(
                source = source,
                key = %key,
                attempt = attempt,
                max_attempts = max_attempts,
                backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                reason = %reason,
                "Retrying resolution"
            );
        }
    }
}

fn log_cache(source: &str, event: &CacheEvent) {
    match event {
        CacheEvent::Hit { key, path } => {
            info!(source = source, key = %key, path = %path.display(), "Cache hit");
        }
        CacheEvent::Miss { key } => {
            debug!(source = source, key = %key, "Cache miss");
        }
        CacheEvent::Joined { key } => {
            debug!(source = source, key = %key, "Joined in-flight fetch");
        }
        CacheEvent::Committed { key, path, bytes } => {
            info!(
                source = source,
                key = %key,
                path = %path.display(),
                bytes = bytes,
                "Asset committed"
            );
        }
        CacheEvent::Failed { key, failure } => {
            error!(
                source = source,
                key = %key,
                retryable = failure.retryable,
                code = ?failure.code,
                message = %failure.message,
                hint = ?failure.hint,
                "Resolution failed"
            );
        }
        CacheEvent::Removed { key, path } => {
            info!(source = source, key = %key, path = %path.display(), "Asset removed");
        }
        CacheEvent::PartialsCleaned { removed } => {
            info!(source = source, removed = removed, "Partial downloads cleaned");
        }
    }
}
