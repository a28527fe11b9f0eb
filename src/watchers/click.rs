//! Click capture

use crate::classifier::truncate;
use crate::config::TrackerConfig;
use crate::dom::NodeId;
use crate::logger::{CaptureContext, EventLogger};
use crate::types::EventType;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// A click as reported by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickSignal {
    pub target: NodeId,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub ctrl_key: bool,
    #[serde(default)]
    pub shift_key: bool,
}

/// Emits a `click` event for every click, without debouncing
#[derive(Debug, Clone)]
pub struct ClickWatcher {
    text_limit: usize,
    clicks: u64,
}

impl ClickWatcher {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            text_limit: config.click_text_limit,
            clicks: 0,
        }
    }

    pub fn clicks(&self) -> u64 {
        self.clicks
    }

    /// Record a click; clicks on nodes the page does not know are skipped
    pub fn on_click(
        &mut self,
        ctx: &CaptureContext<'_>,
        logger: &mut EventLogger,
        click: &ClickSignal,
    ) {
        let Some(target) = ctx.document.element(click.target) else {
            log::debug!("click on unknown node {:?} ignored", click.target);
            return;
        };
        self.clicks += 1;

        logger.log_event(
            ctx,
            EventType::Click,
            ctx.classifier.describe(target),
            json!({
                "x": click.x,
                "y": click.y,
                "ctrlKey": click.ctrl_key,
                "shiftKey": click.shift_key,
                "targetInnerText": truncate(target.text.trim(), self.text_limit),
            }),
        );
    }
}
