//! Out-of-band session events
//!
//! Errors and telemetry are pushed to every subscribed receiver. Delivery
//! is best-effort: with no subscribers nothing is built or sent, and a
//! subscriber whose receiver was dropped is pruned on the next emit.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::HighlightError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Error,
    Telemetry,
}

/// A single notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEvent {
    pub kind: EventKind,
    pub payload: Value,
}

impl SessionEvent {
    pub fn telemetry(kind: &str) -> Self {
        Self {
            kind: EventKind::Telemetry,
            payload: json!({ "type": kind }),
        }
    }

    pub fn error(operation: &str, err: &HighlightError, recoverable: bool) -> Self {
        Self {
            kind: EventKind::Error,
            payload: json!({
                "type": err.kind_name(),
                "operation": operation,
                "code": err.code(),
                "message": err.to_string(),
                "recoverable": recoverable,
            }),
        }
    }

    /// The `type` field of the payload, if any
    pub fn event_type(&self) -> Option<&str> {
        self.payload.get("type").and_then(Value::as_str)
    }
}

/// Fan-out of [`SessionEvent`]s to subscribers.
///
/// Cloning shares the subscriber list.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    listeners: Arc<Mutex<Vec<Sender<SessionEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new listener
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel();
        self.lock().push(tx);
        rx
    }

    pub fn has_listeners(&self) -> bool {
        !self.lock().is_empty()
    }

    /// Send `make()` to every live listener. `make` is only called when
    /// there is at least one listener.
    pub fn emit_with<F>(&self, make: F)
    where
        F: FnOnce() -> SessionEvent,
    {
        let mut listeners = self.lock();
        if listeners.is_empty() {
            return;
        }
        let event = make();
        listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sender<SessionEvent>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_listeners_means_no_work() {
        let bus = EventBus::new();
        let mut built = false;
        bus.emit_with(|| {
            built = true;
            SessionEvent::telemetry("x")
        });
        assert!(!built);
    }

    #[test]
    fn test_every_listener_receives() {
        let bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.emit_with(|| SessionEvent::telemetry("memory_warning_handled"));

        assert_eq!(
            a.try_recv().unwrap().event_type(),
            Some("memory_warning_handled")
        );
        assert_eq!(b.try_recv().unwrap().kind, EventKind::Telemetry);
    }

    #[test]
    fn test_dropped_listeners_are_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        drop(rx);
        assert!(bus.has_listeners());

        bus.emit_with(|| SessionEvent::telemetry("x"));
        assert!(!bus.has_listeners());
    }

    #[test]
    fn test_error_payload_shape() {
        let event = SessionEvent::error("tokenize", &HighlightError::NoThemeSpecified, true);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "error");
        assert_eq!(json["payload"]["type"], "no_theme_specified");
        assert_eq!(json["payload"]["operation"], "tokenize");
        assert_eq!(json["payload"]["code"], 8);
        assert_eq!(json["payload"]["recoverable"], true);
    }
}
