//! This module provides a `tracing` layer that turns every event into a
//! `LogEntry` and stores it in a `LogBuffer`.
use super::LogBuffer;
use crate::types::{LogEntry, LogLevel};
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

/// Target prefix of every event this crate emits.
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Whether an event comes from outside this crate.
///
/// Used as the per-layer filter of the capture layer, so the analyzer's own
/// logging never turns into entries it later analyzes.
pub fn is_external_event(metadata: &Metadata<'_>) -> bool {
    let target = metadata.target();
    !(target == OWN_TARGET
        || target
            .strip_prefix(OWN_TARGET)
            .is_some_and(|rest| rest.starts_with("::")))
}

/// A `tracing` layer that captures log events into a `LogBuffer`.
pub struct LogCaptureLayer {
    buffer: Arc<LogBuffer>,
}

impl LogCaptureLayer {
    /// Creates a new `LogCaptureLayer`.
    ///
    /// # Arguments
    ///
    /// * `buffer` - The `LogBuffer` that receives captured entries.
    pub fn new(buffer: Arc<LogBuffer>) -> Self {
        Self { buffer }
    }
}

impl<S> Layer<S> for LogCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    /// Converts the event into a `LogEntry` and adds it to the buffer.
    ///
    /// The component is the last segment of the module path, the message
    /// field becomes the entry message and every other field lands in `data`.
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let component = match metadata.module_path() {
            Some(module_path) => module_path
                .rsplit("::")
                .next()
                .unwrap_or(module_path)
                .to_string(),
            None => metadata.target().to_string(),
        };

        let level = LogLevel::from(*metadata.level());
        let mut entry = LogEntry::new(Utc::now(), level, visitor.message).with_component(component);

        if let Some(Value::String(stack)) = visitor.fields.remove("stack") {
            entry = entry.with_stack(stack);
        }
        if let Some(Value::String(session)) = visitor.fields.remove("session_id") {
            entry = entry.with_session(session);
        }
        if !visitor.fields.is_empty() {
            entry = entry.with_data(Value::Object(visitor.fields));
        }

        self.buffer.add_entry(entry);
    }
}

/// Collects the `message` field and every other field as JSON.
#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Map<String, Value>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &tracing::field::Field, value: Value) {
        if field.name() == "message" {
            self.message = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.insert(field, Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.insert(field, Value::from(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn events_become_buffered_entries() {
        let buffer = Arc::new(LogBuffer::new(16));
        let subscriber =
            tracing_subscriber::registry().with(LogCaptureLayer::new(buffer.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(attempt = 3, session_id = "s-9", "token refresh failed");
            tracing::info!("page rendered");
        });

        let entries = buffer.snapshot_since(Utc::now() - Duration::minutes(1), None);
        assert_eq!(entries.len(), 2);

        let error = &entries[0];
        assert_eq!(error.level, LogLevel::Error);
        assert_eq!(error.message, "token refresh failed");
        assert_eq!(error.component.as_deref(), Some("tests"));
        assert_eq!(error.session_id.as_deref(), Some("s-9"));
        assert_eq!(error.data.as_ref().unwrap()["attempt"], 3);

        assert_eq!(entries[1].level, LogLevel::Info);
        assert!(entries[1].data.is_none());
    }

    #[test]
    fn own_events_are_not_external() {
        let buffer = Arc::new(LogBuffer::new(16));
        let subscriber = tracing_subscriber::registry().with(
            LogCaptureLayer::new(buffer.clone())
                .with_filter(tracing_subscriber::filter::filter_fn(is_external_event)),
        );

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("analysis internals");
            tracing::warn!(target: "dayboard_log_review::storage", "store internals");
            tracing::warn!(target: "dayboard_log_review_plugin", "lookalike crate");
            tracing::warn!(target: "dayboard_web", "widget failed");
        });

        let messages: Vec<_> = buffer
            .snapshot_since(Utc::now() - Duration::minutes(1), None)
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["lookalike crate", "widget failed"]);
    }
}
