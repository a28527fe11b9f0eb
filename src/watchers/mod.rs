//! Interaction watchers
//!
//! Each watcher is a small state machine fed by host signals and timers. A
//! watcher only talks to the [`EventLogger`](crate::logger::EventLogger);
//! watchers never call each other. Composition happens in the tracker.

pub mod click;
pub mod hover;
pub mod idle;
pub mod page_visibility;
pub mod resize;
pub mod scroll;
pub mod selection;

pub use click::{ClickSignal, ClickWatcher};
pub use hover::HoverWatcher;
pub use idle::{IdleState, IdleWatcher};
pub use page_visibility::PageVisibilityWatcher;
pub use resize::ResizeWatcher;
pub use scroll::{ScrollDirection, ScrollWatcher};
pub use selection::{SelectionRange, SelectionWatcher};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::classifier::ElementClassifier;
    use crate::config::TrackerConfig;
    use crate::dom::{Document, Element, Rect, Size};
    use crate::logger::{CaptureContext, EventLogger};
    use crate::sink::MemorySink;
    use crate::types::{Event, EventType, Session};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    pub fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap()
    }

    pub fn at(ms: i64) -> DateTime<Utc> {
        t0() + Duration::milliseconds(ms)
    }

    pub fn logger() -> EventLogger {
        EventLogger::new(
            Session::new(t0()),
            Box::new(MemorySink::new()),
            &TrackerConfig::default(),
        )
    }

    pub fn page() -> Document {
        let mut doc = Document::new(Size::new(800, 600));
        doc.insert(
            Element::new(1, "IMG")
                .with_class("track-view")
                .with_attr("data-track-id", "hero")
                .with_attr("alt", "Logo")
                .with_rect(Rect::new(0.0, 0.0, 400.0, 300.0)),
        );
        doc.insert(
            Element::new(2, "BUTTON")
                .with_text("Sign up")
                .with_rect(Rect::new(400.0, 0.0, 200.0, 100.0)),
        );
        doc.insert(
            Element::new(3, "P")
                .with_text("Our plans start at nine dollars a month.")
                .with_rect(Rect::new(0.0, 300.0, 800.0, 100.0)),
        );
        doc
    }

    pub fn ctx<'a>(
        document: &'a Document,
        classifier: &'a ElementClassifier,
        now: DateTime<Utc>,
    ) -> CaptureContext<'a> {
        CaptureContext {
            document,
            classifier,
            now,
        }
    }

    pub fn of_type(logger: &EventLogger, event_type: EventType) -> Vec<Event> {
        logger
            .session()
            .events()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }
}
