//! Host signals
//!
//! Everything the host environment reports to the tracker, stamped with the
//! host clock. Signals are serializable so recorded sessions can be replayed.

use crate::dom::{Element, NodeId, Rect};
use crate::watchers::{ClickSignal, SelectionRange};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A browser-level signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostSignal {
    Click(ClickSignal),
    PointerMove {
        x: f64,
        y: f64,
    },
    /// Pointer release, with the selection current at that moment
    PointerUp {
        #[serde(default)]
        selection: Option<SelectionRange>,
    },
    KeyPress,
    TouchStart,
    /// Vertical scroll to an absolute offset
    Scroll {
        y: f64,
    },
    Resize {
        width: u32,
        height: u32,
    },
    VisibilityChange {
        hidden: bool,
    },
    /// Layout change for one element (document coordinates)
    Layout {
        node: NodeId,
        rect: Rect,
    },
    InsertElement {
        element: Element,
    },
    RemoveElement {
        node: NodeId,
    },
}

impl HostSignal {
    /// Signals that count as user activity for idle tracking
    pub fn is_activity(&self) -> bool {
        matches!(
            self,
            HostSignal::Click(_)
                | HostSignal::PointerMove { .. }
                | HostSignal::KeyPress
                | HostSignal::TouchStart
                | HostSignal::Scroll { .. }
        )
    }

    /// Signals that move elements relative to the viewport
    pub fn changes_geometry(&self) -> bool {
        matches!(
            self,
            HostSignal::Scroll { .. }
                | HostSignal::Resize { .. }
                | HostSignal::Layout { .. }
                | HostSignal::InsertElement { .. }
                | HostSignal::RemoveElement { .. }
        )
    }
}

/// A signal with the host instant it was dispatched at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSignal {
    pub at: DateTime<Utc>,
    pub signal: HostSignal,
}

impl TimedSignal {
    pub fn new(at: DateTime<Utc>, signal: HostSignal) -> Self {
        Self { at, signal }
    }
}
