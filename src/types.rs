//! Event and session data types
//!
//! These are the records produced by the capture engine. Field names follow
//! the event schema consumed by sinks (`eventType`, `scrollPosition`,
//! `additionalData`, ...).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Event tags emitted by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Load,
    Unload,
    View,
    Viewing,
    Click,
    Selection,
    Scroll,
    Hover,
    Visibility,
    Idle,
    Active,
    Resize,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Load => "load",
            EventType::Unload => "unload",
            EventType::View => "view",
            EventType::Viewing => "viewing",
            EventType::Click => "click",
            EventType::Selection => "selection",
            EventType::Scroll => "scroll",
            EventType::Hover => "hover",
            EventType::Visibility => "visibility",
            EventType::Idle => "idle",
            EventType::Active => "active",
            EventType::Resize => "resize",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trackable element currently inside the viewport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleElement {
    /// Classifier description
    pub element: String,
    /// Fraction of the element's height inside the viewport, 2 decimals
    pub visibility_ratio: f64,
}

/// Viewport snapshot attached to every event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub visible_elements: Vec<VisibleElement>,
}

/// A captured interaction record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Capture instant, millisecond precision
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    /// Classifier output or a static label such as `page loaded`
    pub element: String,
    pub viewport: Viewport,
    pub scroll_position: i64,
    /// Payload specific to the event type
    #[serde(default)]
    pub additional_data: Map<String, Value>,
}

/// Per page-load session record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    session_id: String,
    pub session_start: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Idle seconds as of the last idle tick
    pub idle_time: f64,
    pub scroll_position: i64,
    /// Snapshot taken when tracking started
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_viewport: Option<Viewport>,
    events: Vec<Event>,
}

impl Session {
    /// Start a new session at `now` with a fresh identifier
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            session_id: generate_session_id(now),
            session_start: now,
            last_activity: now,
            idle_time: 0.0,
            scroll_position: 0,
            current_viewport: None,
            events: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Events in capture order
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Seconds since the last recorded activity
    pub fn idle_seconds(&self, now: DateTime<Utc>) -> f64 {
        seconds_between(self.last_activity, now)
    }

    /// Seconds since the session started
    pub fn duration_seconds(&self, now: DateTime<Utc>) -> f64 {
        seconds_between(self.session_start, now)
    }

    /// Record user activity at `now`
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity {
            self.last_activity = now;
        }
        self.idle_time = 0.0;
    }

    pub(crate) fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub(crate) fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.events.last().map(|e| e.timestamp)
    }
}

/// `session_<9 random chars>_<start millis>`
fn generate_session_id(now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", &random[..9], now.timestamp_millis())
}

/// Elapsed seconds with millisecond resolution, never negative
pub fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let ms = (to - from).num_milliseconds();
    if ms > 0 {
        ms as f64 / 1000.0
    } else {
        0.0
    }
}

/// Round a ratio to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
