//! Forwards engine tracing events into a channel so hosts can show them in
//! their own log panes.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::Subscriber;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

#[derive(Debug, Clone, Serialize)]
pub struct LogEnvelope {
    pub timestamp_ms: u64,
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "map_is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

fn map_is_empty(map: &serde_json::Map<String, serde_json::Value>) -> bool {
    map.is_empty()
}

#[derive(Clone)]
pub struct LogForwardLayer {
    sender: Sender<LogEnvelope>,
}

impl LogForwardLayer {
    pub fn new(sender: Sender<LogEnvelope>) -> Self {
        Self { sender }
    }
}

/// Create a forwarding layer and the receiver a host drains for display.
pub fn log_channel() -> (LogForwardLayer, Receiver<LogEnvelope>) {
    let (sender, receiver) = unbounded();
    (LogForwardLayer { sender }, receiver)
}

impl<S> Layer<S> for LogForwardLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = LogVisitor::default();
        event.record(&mut visitor);
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let message = visitor
            .message
            .clone()
            .unwrap_or_else(|| metadata.target().to_string());
        let envelope = LogEnvelope {
            timestamp_ms,
            level: metadata.level().to_string(),
            target: metadata.target().to_string(),
            message,
            fields: visitor.fields,
        };
        let _ = self.sender.send(envelope);
    }
}

#[derive(Default)]
struct LogVisitor {
    message: Option<String>,
    fields: serde_json::Map<String, serde_json::Value>,
}

impl LogVisitor {
    fn record_value(&mut self, field: &tracing::field::Field, value: serde_json::Value) {
        if field.name() == "message" {
            if let serde_json::Value::String(text) = value {
                self.message = Some(text);
            } else {
                self.message = Some(value.to_string());
            }
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl tracing::field::Visit for LogVisitor {
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.record_value(field, serde_json::Value::Bool(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.record_value(field, value.into());
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.record_value(field, value.into());
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        if let Some(number) = serde_json::Number::from_f64(value) {
            self.record_value(field, serde_json::Value::Number(number));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.record_value(field, serde_json::Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.record_value(field, serde_json::Value::String(format!("{value:?}")));
    }
}
