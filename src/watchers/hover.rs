//! Hover capture
//!
//! Pointer movement re-arms a debounce; when the pointer has rested for the
//! full delay, the element under it is reported once.

use crate::config::TrackerConfig;
use crate::dom::NodeId;
use crate::logger::{CaptureContext, EventLogger};
use crate::schedule::Debounce;
use crate::types::EventType;
use chrono::{DateTime, Utc};
use serde_json::json;

#[derive(Debug, Clone)]
pub struct HoverWatcher {
    rest: Debounce,
    pointer: Option<(f64, f64)>,
    current: Option<NodeId>,
}

impl HoverWatcher {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            rest: Debounce::new(TrackerConfig::millis(config.hover_delay_ms)),
            pointer: None,
            current: None,
        }
    }

    /// Element last reported as hovered
    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.rest.deadline()
    }

    pub fn on_pointer_move(&mut self, now: DateTime<Utc>, x: f64, y: f64) {
        self.pointer = Some((x, y));
        self.rest.arm(now);
    }

    /// Run the pending hover check if its delay has elapsed at `ctx.now`
    pub fn on_timer(&mut self, ctx: &CaptureContext<'_>, logger: &mut EventLogger) {
        if self.rest.fire_if_due(ctx.now).is_none() {
            return;
        }
        let Some((x, y)) = self.pointer else {
            return;
        };
        let Some(element) = ctx.document.element_at(x, y) else {
            return;
        };
        if self.current == Some(element.id) {
            return;
        }

        logger.log_event(
            ctx,
            EventType::Hover,
            ctx.classifier.describe(element),
            json!({ "x": x, "y": y, "duration": "start" }),
        );
        self.current = Some(element.id);
    }
}
