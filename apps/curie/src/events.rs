//! Event handling and status display

use crate::logging::log_event_with_tracing;
use console::Style;
use curie_events::{AppEvent, CacheEvent, DownloadEvent, GeneralEvent};
use std::time::Duration;

/// Event handler for status lines and user feedback
///
/// Status lines go to stderr so stdout stays clean for results.
pub struct EventHandler {
    colors_enabled: bool,
    debug_enabled: bool,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, debug_enabled: bool) -> Self {
        Self {
            colors_enabled,
            debug_enabled,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: AppEvent) {
        log_event_with_tracing(&event);

        if event.log_level() == tracing::Level::DEBUG && !self.debug_enabled {
            return;
        }

        if let Some(line) = self.render(&event) {
            eprintln!("{line}");
        }
    }

    /// Render the status line for an event, if it has one
    fn render(&self, event: &AppEvent) -> Option<String> {
        match event {
            AppEvent::General(general) => self.render_general(general),
            AppEvent::Download(download) => self.render_download(download),
            AppEvent::Cache(cache) => self.render_cache(cache),
        }
    }

    fn render_general(&self, event: &GeneralEvent) -> Option<String> {
        match event {
            GeneralEvent::Warning { message, context } => {
                let mut line = format!("{} {message}", self.paint(&yellow(), "warning:"));
                if let Some(context) = context {
                    line.push_str(&format!(" ({context})"));
                }
                Some(line)
            }
            GeneralEvent::OperationStarted { .. } | GeneralEvent::OperationCompleted { .. } => {
                None
            }
        }
    }

    fn render_download(&self, event: &DownloadEvent) -> Option<String> {
        match event {
            DownloadEvent::SignedUrlIssued { key, host } => Some(format!(
                "{} signed URL for {key} ({host})",
                self.paint(&dim(), "debug:")
            )),
            DownloadEvent::Started { key, host } => Some(format!(
                "{} {key} from {host}",
                self.paint(&cyan(), "Downloading")
            )),
            DownloadEvent::Completed {
                key,
                bytes,
                elapsed,
            } => Some(format!(
                "{} {key} ({}, {})",
                self.paint(&green(), "Downloaded"),
                format_bytes(*bytes),
                format_elapsed(*elapsed)
            )),
            DownloadEvent::Failed { key, failure } => Some(format!(
                "{} {key}: {}",
                self.paint(&red(), "Download failed"),
                failure.message
            )),
            DownloadEvent::Retrying {
                key,
                attempt,
                max_attempts,
                backoff,
                reason,
            } => Some(format!(
                "{} {key} in {} (attempt {attempt}/{max_attempts}): {reason}",
                self.paint(&yellow(), "Retrying"),
                format_elapsed(*backoff)
            )),
        }
    }

    fn render_cache(&self, event: &CacheEvent) -> Option<String> {
        match event {
            CacheEvent::Hit { key, .. } => {
                Some(format!("{} {key}", self.paint(&green(), "Cached")))
            }
            CacheEvent::Miss { key } => Some(format!(
                "{} cache miss for {key}",
                self.paint(&dim(), "debug:")
            )),
            CacheEvent::Joined { key } => Some(format!(
                "{} joined in-flight fetch for {key}",
                self.paint(&dim(), "debug:")
            )),
            CacheEvent::Committed { .. } => None,
            CacheEvent::Failed { key, failure } => {
                let mut line = format!(
                    "{} {key}: {}",
                    self.paint(&red(), "Failed"),
                    failure.message
                );
                if let Some(hint) = &failure.hint {
                    line.push_str(&format!("\n  Hint: {hint}"));
                }
                Some(line)
            }
            CacheEvent::Removed { key, .. } => {
                Some(format!("{} {key}", self.paint(&green(), "Removed")))
            }
            CacheEvent::PartialsCleaned { removed } => Some(format!(
                "{} {removed} partial download(s)",
                self.paint(&green(), "Cleaned")
            )),
        }
    }

    fn paint(&self, style: &Style, text: &str) -> String {
        if self.colors_enabled {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }
}

fn red() -> Style {
    Style::new().red().bold()
}

fn yellow() -> Style {
    Style::new().yellow().bold()
}

fn green() -> Style {
    Style::new().green().bold()
}

fn cyan() -> Style {
    Style::new().cyan().bold()
}

fn dim() -> Style {
    Style::new().dim()
}

/// Human-readable byte count
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64 / 1024.0;
    let mut unit = UNITS[0];
    for next in &UNITS[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{value:.1} {unit}")
}

fn format_elapsed(elapsed: Duration) -> String {
    if elapsed.as_secs() >= 1 {
        format!("{:.1}s", elapsed.as_secs_f64())
    } else {
        format!("{}ms", elapsed.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curie_events::FailureContext;
    use std::path::PathBuf;

    #[test]
    fn test_plain_lines_without_colors() {
        let handler = EventHandler::new(false, false);
        let line = handler
            .render(&AppEvent::Cache(CacheEvent::Hit {
                key: "abc".to_string(),
                path: PathBuf::from("/tmp/abc.usdz"),
            }))
            .unwrap();
        assert_eq!(line, "Cached abc");
    }

    #[test]
    fn test_failure_line_carries_hint() {
        let handler = EventHandler::new(false, false);
        let failure = FailureContext::new(
            Some("network.timeout"),
            "request timed out",
            Some("Check your connection"),
            true,
        );
        let line = handler
            .render(&AppEvent::Cache(CacheEvent::Failed {
                key: "abc".to_string(),
                failure,
            }))
            .unwrap();
        assert!(line.starts_with("Failed abc: request timed out"));
        assert!(line.contains("Hint: Check your connection"));
    }

    #[test]
    fn test_warning_line_includes_context() {
        let handler = EventHandler::new(false, false);
        let event = AppEvent::General(GeneralEvent::warning_with_context(
            "kept partial download .abc.x1.part",
            "fetch for abc is still running",
        ));
        assert_eq!(
            handler.render(&event).unwrap(),
            "warning: kept partial download .abc.x1.part (fetch for abc is still running)"
        );
    }

    #[test]
    fn test_operation_events_are_silent() {
        let handler = EventHandler::new(false, true);
        let event = AppEvent::General(GeneralEvent::OperationStarted {
            operation: "fetch".to_string(),
        });
        assert!(handler.render(&event).is_none());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_millis(250)), "250ms");
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.5s");
    }
}
