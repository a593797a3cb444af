//! Tauri event bus adapter.

use tauri::{AppHandle, Emitter, Runtime};
use trailguard_events::EventBus;

/// Forwards bridge events to the webview.
pub struct TauriEventBus<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> TauriEventBus<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self { app }
    }
}

impl<R: Runtime> EventBus for TauriEventBus<R> {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        if let Err(e) = self.app.emit(topic, payload) {
            tracing::warn!(topic = %topic, error = %e, "Failed to emit event");
        }
    }
}
