//! Viewport resize capture

use crate::config::TrackerConfig;
use crate::logger::{CaptureContext, EventLogger};
use crate::schedule::Debounce;
use crate::types::EventType;
use chrono::{DateTime, Utc};
use serde_json::json;

#[derive(Debug, Clone)]
pub struct ResizeWatcher {
    settle: Debounce,
}

impl ResizeWatcher {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            settle: Debounce::new(TrackerConfig::millis(config.resize_debounce_ms)),
        }
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.settle.deadline()
    }

    pub fn on_resize(&mut self, now: DateTime<Utc>) {
        self.settle.arm(now);
    }

    /// Report the settled viewport size once the debounce elapses
    pub fn on_timer(&mut self, ctx: &CaptureContext<'_>, logger: &mut EventLogger) {
        if self.settle.fire_if_due(ctx.now).is_none() {
            return;
        }
        let viewport = ctx.document.viewport;
        logger.log_event(
            ctx,
            EventType::Resize,
            "window resized",
            json!({ "width": viewport.width, "height": viewport.height }),
        );
    }
}
