#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in curie
//!
//! Library crates never log or print directly. They emit typed events over an
//! unbounded channel and the CLI decides how to render them: as tracing
//! records, as status lines, or not at all.
//!
//! ## Architecture
//!
//! - **Domain events**: grouped by concern (`General`, `Download`, `Cache`)
//! - **`EventEmitter` trait**: one API for anything holding an optional sender
//! - **Tracing hints**: each event knows its log level and target

pub mod events;
pub use events::{AppEvent, CacheEvent, DownloadEvent, FailureContext, GeneralEvent};

use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Sender half of the application event channel
pub type EventSender = UnboundedSender<AppEvent>;

/// Receiver half of the application event channel
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout curie
///
/// Implemented by the raw `EventSender` and by any component that optionally
/// carries one. Emission never fails: a dropped receiver silently discards.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(event);
        }
    }

    /// Emit a warning event with context
    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    /// Emit an operation started event
    fn emit_operation_started(&self, operation: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::OperationStarted {
            operation: operation.into(),
        }));
    }

    /// Emit an operation completed event
    fn emit_operation_completed(&self, operation: impl Into<String>, success: bool) {
        self.emit(AppEvent::General(GeneralEvent::OperationCompleted {
            operation: operation.into(),
            success,
        }));
    }

    /// Emit a download started event
    fn emit_download_started(&self, key: impl Into<String>, host: impl Into<String>) {
        self.emit(AppEvent::Download(DownloadEvent::Started {
            key: key.into(),
            host: host.into(),
        }));
    }

    /// Emit a download completed event
    fn emit_download_completed(&self, key: impl Into<String>, bytes: u64, elapsed: Duration) {
        self.emit(AppEvent::Download(DownloadEvent::Completed {
            key: key.into(),
            bytes,
            elapsed,
        }));
    }

    /// Emit a cache hit event
    fn emit_cache_hit(&self, key: impl Into<String>, path: PathBuf) {
        self.emit(AppEvent::Cache(CacheEvent::Hit {
            key: key.into(),
            path,
        }));
    }

    /// Emit a cache failure event
    fn emit_cache_failed(&self, key: impl Into<String>, failure: FailureContext) {
        self.emit(AppEvent::Cache(CacheEvent::Failed {
            key: key.into(),
            failure,
        }));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
/// This allows `EventSender` to be used directly where `EventEmitter` is expected
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}
