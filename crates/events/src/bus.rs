//! Event emission seam.
//!
//! The bridge core emits through `EventBus` so it can run under Tauri, in
//! tests, or headless without knowing which one.

use std::sync::{Arc, Mutex, MutexGuard};

pub trait EventBus: Send + Sync {
    /// Emit `payload` on `topic` (e.g. "inference:download_progress").
    fn emit(&self, topic: &str, payload: serde_json::Value);
}

pub type EventBusRef = Arc<dyn EventBus>;

/// A recorded emission.
#[derive(Debug, Clone)]
pub struct EmittedEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// Records every emission in order. Used by tests to inspect the side channel.
#[derive(Default)]
pub struct InMemoryEventBus {
    events: Mutex<Vec<EmittedEvent>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking emitter must not hide the events recorded before it.
    fn guard(&self) -> MutexGuard<'_, Vec<EmittedEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn events(&self) -> Vec<EmittedEvent> {
        self.guard().clone()
    }

    /// Payloads emitted on `topic`, oldest first.
    pub fn payloads_for(&self, topic: &str) -> Vec<serde_json::Value> {
        self.guard()
            .iter()
            .filter(|e| e.topic == topic)
            .map(|e| e.payload.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.guard().clear();
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}

impl EventBus for InMemoryEventBus {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        self.guard().push(EmittedEvent {
            topic: topic.to_string(),
            payload,
        });
    }
}

/// Discards everything.
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn emit(&self, _topic: &str, _payload: serde_json::Value) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_in_memory_bus_keeps_order_per_topic() {
        let bus = InMemoryEventBus::new();
        bus.emit("inference:download_progress", json!({"progress": 10}));
        bus.emit("inference:model_loaded", json!({"initialized": true}));
        bus.emit("inference:download_progress", json!({"progress": 20}));

        assert_eq!(bus.len(), 3);
        let progress = bus.payloads_for("inference:download_progress");
        assert_eq!(progress, vec![json!({"progress": 10}), json!({"progress": 20})]);
        assert!(bus.payloads_for("inference:missing").is_empty());
    }

    #[test]
    fn test_in_memory_bus_clear() {
        let bus = InMemoryEventBus::new();
        bus.emit("topic", json!({}));
        assert!(!bus.is_empty());
        bus.clear();
        assert!(bus.is_empty());
    }

    #[test]
    fn test_null_bus_accepts_events() {
        NullEventBus.emit("topic", json!({"ignored": true}));
    }
}
