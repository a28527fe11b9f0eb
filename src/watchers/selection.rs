//! Text selection capture

use crate::classifier::preview;
use crate::config::TrackerConfig;
use crate::dom::NodeId;
use crate::logger::{CaptureContext, EventLogger};
use crate::types::EventType;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// The current selection at pointer release.
///
/// `start` and `end` are the elements containing the range boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub text: String,
    pub start: NodeId,
    pub end: NodeId,
}

#[derive(Debug, Clone)]
pub struct SelectionWatcher {
    text_limit: usize,
}

impl SelectionWatcher {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            text_limit: config.selection_text_limit,
        }
    }

    /// Report a non-empty selection once per pointer release
    pub fn on_pointer_up(
        &mut self,
        ctx: &CaptureContext<'_>,
        logger: &mut EventLogger,
        selection: Option<&SelectionRange>,
    ) {
        let Some(selection) = selection else {
            return;
        };
        let text = selection.text.trim();
        if text.is_empty() {
            return;
        }

        let describe = |id: NodeId| {
            ctx.document
                .element(id)
                .map(|e| ctx.classifier.describe(e))
                .unwrap_or_default()
        };

        logger.log_event(
            ctx,
            EventType::Selection,
            format!("\"{}\"", preview(text, self.text_limit)),
            json!({
                "selectionLength": text.chars().count(),
                "startElement": describe(selection.start),
                "endElement": describe(selection.end),
            }),
        );
    }
}
