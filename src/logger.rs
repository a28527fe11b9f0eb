//! Event logger
//!
//! The single write path into the session: builds the event record, appends
//! it and forwards it to the sink. Watchers do their own debouncing; the
//! logger never drops or merges events.

use crate::classifier::ElementClassifier;
use crate::config::TrackerConfig;
use crate::dom::Document;
use crate::sink::EventSink;
use crate::types::{Event, EventType, Session};
use crate::visibility;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// What a watcher needs to know about the moment it is capturing
pub struct CaptureContext<'a> {
    pub document: &'a Document,
    pub classifier: &'a ElementClassifier,
    pub now: DateTime<Utc>,
}

/// Appends events to the session and forwards them to the sink
pub struct EventLogger {
    session: Session,
    sink: Box<dyn EventSink>,
    flush_every: usize,
    track_class: String,
    snapshot_min_ratio: f64,
    sink_failures: u64,
}

impl EventLogger {
    pub fn new(session: Session, sink: Box<dyn EventSink>, config: &TrackerConfig) -> Self {
        Self {
            session,
            sink,
            flush_every: config.flush_every.max(1),
            track_class: config.track_class.clone(),
            snapshot_min_ratio: config.snapshot_min_ratio,
            sink_failures: 0,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Number of sink calls that returned an error
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures
    }

    /// Build, append and forward one event.
    ///
    /// Object payloads become `additionalData` as-is, `null` becomes an empty
    /// map and any other value is stored under `value`.
    pub fn log_event(
        &mut self,
        ctx: &CaptureContext<'_>,
        event_type: EventType,
        element: impl Into<String>,
        data: Value,
    ) {
        let additional_data = match data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };

        let event = Event {
            timestamp: self.next_timestamp(ctx.now),
            event_type,
            element: element.into(),
            viewport: self.snapshot(ctx),
            scroll_position: ctx.document.scroll_y.round() as i64,
            additional_data,
        };

        self.session.push(event);
        let count = self.session.event_count();

        if let Some(event) = self.session.events().last() {
            if let Err(e) = self.sink.accept(event) {
                self.sink_failures += 1;
                log::warn!("sink rejected {} event: {}", event.event_type, e);
            }
        }

        if count.is_multiple_of(self.flush_every) {
            self.flush();
        }
    }

    /// Hand every captured event to the sink's batch hook
    pub fn flush(&mut self) {
        if let Err(e) = self.sink.flush(self.session.events()) {
            self.sink_failures += 1;
            log::warn!(
                "sink flush of {} events failed: {}",
                self.session.event_count(),
                e
            );
        }
    }

    /// Current viewport snapshot as attached to events
    pub fn snapshot(&self, ctx: &CaptureContext<'_>) -> crate::types::Viewport {
        visibility::snapshot(
            ctx.document,
            ctx.classifier,
            &self.track_class,
            self.snapshot_min_ratio,
        )
    }

    pub(crate) fn into_session(self) -> Session {
        self.session
    }

    /// Millisecond-truncated instant, never earlier than the previous event
    fn next_timestamp(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let truncated = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
        match self.session.last_timestamp() {
            Some(last) if last > truncated => last,
            _ => truncated,
        }
    }
}
