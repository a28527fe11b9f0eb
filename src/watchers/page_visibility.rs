//! Page visibility (tab hidden/shown) capture

use crate::logger::{CaptureContext, EventLogger};
use crate::types::{seconds_between, EventType};
use chrono::{DateTime, Utc};
use serde_json::json;

#[derive(Debug, Clone, Default)]
pub struct PageVisibilityWatcher {
    hidden_since: Option<DateTime<Utc>>,
}

impl PageVisibilityWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden_since.is_some()
    }

    /// Page was already hidden when tracking started
    pub fn assume_hidden(&mut self, since: DateTime<Utc>) {
        self.hidden_since = Some(since);
    }

    /// Report a transition. Returns true when the page became visible again.
    pub fn on_change(
        &mut self,
        ctx: &CaptureContext<'_>,
        logger: &mut EventLogger,
        hidden: bool,
    ) -> bool {
        let stamp = ctx.now.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        match (hidden, self.hidden_since) {
            (true, None) => {
                logger.log_event(
                    ctx,
                    EventType::Visibility,
                    "page hidden",
                    json!({ "timestamp": stamp }),
                );
                self.hidden_since = Some(ctx.now);
                false
            }
            (false, Some(since)) => {
                logger.log_event(
                    ctx,
                    EventType::Visibility,
                    "page visible",
                    json!({
                        "timestamp": stamp,
                        "timeSinceHidden": seconds_between(since, ctx.now),
                    }),
                );
                self.hidden_since = None;
                true
            }
            _ => false,
        }
    }
}
