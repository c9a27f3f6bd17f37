use super::capture::DiagnosticsCapture;
use std::fmt::{self, Write as _};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Copies log events into a [`DiagnosticsCapture`] so they show up in the
/// post-restart report.
pub struct DiagnosticsLayer {
    capture: Arc<DiagnosticsCapture>,
    max_level: Level,
}

impl DiagnosticsLayer {
    pub fn new(capture: Arc<DiagnosticsCapture>, max_level: Level) -> Self {
        Self { capture, max_level }
    }

    /// Parse a level name from config; unknown names fall back to `info`.
    pub fn parse_level(raw: &str) -> Level {
        match raw.trim().to_ascii_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" | "warning" => Level::WARN,
            "debug" => Level::DEBUG,
            "trace" => Level::TRACE,
            _ => Level::INFO,
        }
    }
}

impl<S: Subscriber> Layer<S> for DiagnosticsLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        // More verbose levels compare greater.
        if *meta.level() > self.max_level {
            return;
        }

        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        self.capture.append(format!(
            "[{}] {:<5} {}: {}{}",
            chrono::Utc::now().format("%H:%M:%S"),
            meta.level(),
            meta.target(),
            visitor.message,
            visitor.fields,
        ));
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}
