//! Page tracker (lifecycle controller)
//!
//! Owns the page model, the session logger and every watcher, and wires them
//! together: host signals are applied to the page, routed to the watchers
//! that care about them, and timers are fired in deadline order as the host
//! clock advances.

use crate::classifier::ElementClassifier;
use crate::config::TrackerConfig;
use crate::dom::{Document, NodeId, Size};
use crate::error::TrackError;
use crate::logger::{CaptureContext, EventLogger};
use crate::schedule::Interval;
use crate::signal::{HostSignal, TimedSignal};
use crate::sink::EventSink;
use crate::types::{EventType, Session};
use crate::visibility::{IntersectionWatcher, SectionWatcher};
use crate::watchers::{
    ClickWatcher, HoverWatcher, IdleState, IdleWatcher, PageVisibilityWatcher, ResizeWatcher,
    ScrollWatcher, SelectionWatcher,
};
use chrono::{DateTime, Utc};
use serde_json::json;

/// Scheduled task owners, in the order they fire when deadlines tie
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Timer {
    Scroll,
    Resize,
    Hover,
    Section,
    Idle,
}

/// Behavioral capture for one page load
pub struct PageTracker {
    config: TrackerConfig,
    classifier: ElementClassifier,
    document: Document,
    logger: EventLogger,
    views: IntersectionWatcher,
    sections: SectionWatcher,
    section_interval: Interval,
    clicks: ClickWatcher,
    hover: HoverWatcher,
    selection: SelectionWatcher,
    scroll: ScrollWatcher,
    resize: ResizeWatcher,
    visibility: PageVisibilityWatcher,
    idle: IdleWatcher,
    clock: DateTime<Utc>,
}

impl PageTracker {
    /// Start tracking at page-ready: emits `load`, runs the first
    /// intersection pass and starts the periodic checks.
    pub fn start(
        document: Document,
        config: TrackerConfig,
        sink: Box<dyn EventSink>,
        now: DateTime<Utc>,
    ) -> Result<Self, TrackError> {
        config.validate()?;

        let logger = EventLogger::new(Session::new(now), sink, &config);
        let mut visibility = PageVisibilityWatcher::new();
        if document.hidden {
            visibility.assume_hidden(now);
        }

        let mut tracker = Self {
            classifier: ElementClassifier::new(&config.track_id_attribute),
            views: IntersectionWatcher::new(&config),
            sections: SectionWatcher::new(&config),
            section_interval: Interval::new(TrackerConfig::millis(
                config.section_check_interval_ms,
            )),
            clicks: ClickWatcher::new(&config),
            hover: HoverWatcher::new(&config),
            selection: SelectionWatcher::new(&config),
            scroll: ScrollWatcher::new(&config),
            resize: ResizeWatcher::new(&config),
            visibility,
            idle: IdleWatcher::new(&config),
            config,
            document,
            logger,
            clock: now,
        };

        let ctx = CaptureContext {
            document: &tracker.document,
            classifier: &tracker.classifier,
            now,
        };
        let screen = tracker.document.screen;
        tracker.logger.log_event(
            &ctx,
            EventType::Load,
            "page loaded",
            json!({
                "url": tracker.document.url,
                "referrer": tracker.document.referrer,
                "userAgent": tracker.document.user_agent,
                "screenSize": format!("{}x{}", screen.width, screen.height),
            }),
        );
        tracker.views.observe(&ctx, &mut tracker.logger);
        tracker.section_interval.start(now);
        tracker.idle.start(now);

        let initial = tracker.logger.snapshot(&ctx);
        tracker.logger.session_mut().current_viewport = Some(initial);
        tracker.logger.session_mut().scroll_position = tracker.document.scroll_y.round() as i64;

        log::debug!(
            "tracking started for session {}",
            tracker.logger.session().session_id()
        );
        Ok(tracker)
    }

    pub fn session(&self) -> &Session {
        self.logger.session()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Latest host instant seen by the tracker
    pub fn now(&self) -> DateTime<Utc> {
        self.clock
    }

    pub fn idle_state(&self) -> IdleState {
        self.idle.state()
    }

    /// Element currently reported as most visible
    pub fn most_visible(&self) -> Option<NodeId> {
        self.sections.current()
    }

    /// Most-visible checks run so far (periodic and scroll-triggered)
    pub fn section_checks(&self) -> u64 {
        self.sections.checks()
    }

    /// Times scrolling settled after the debounce
    pub fn scroll_settles(&self) -> u64 {
        self.scroll.settled()
    }

    pub fn sink_failures(&self) -> u64 {
        self.logger.sink_failures()
    }

    pub fn dispatch_timed(&mut self, timed: TimedSignal) {
        self.dispatch(timed.signal, timed.at);
    }

    /// Deliver one host signal. Timers due before `at` fire first; signals
    /// stamped earlier than the tracker clock are handled at the clock.
    pub fn dispatch(&mut self, signal: HostSignal, at: DateTime<Utc>) {
        self.advance_to(at);
        let now = self.clock;

        self.apply_to_document(&signal);

        let ctx = CaptureContext {
            document: &self.document,
            classifier: &self.classifier,
            now,
        };

        if signal.is_activity() {
            self.idle.on_activity(&ctx, &mut self.logger);
        }

        match &signal {
            HostSignal::Click(click) => self.clicks.on_click(&ctx, &mut self.logger, click),
            HostSignal::PointerMove { x, y } => self.hover.on_pointer_move(now, *x, *y),
            HostSignal::PointerUp { selection } => {
                self.selection
                    .on_pointer_up(&ctx, &mut self.logger, selection.as_ref())
            }
            HostSignal::Scroll { .. } => self.scroll.on_scroll(now),
            HostSignal::Resize { .. } => self.resize.on_resize(now),
            HostSignal::VisibilityChange { hidden } => {
                if self.visibility.on_change(&ctx, &mut self.logger, *hidden) {
                    self.idle.resume(now, &mut self.logger);
                }
            }
            HostSignal::KeyPress
            | HostSignal::TouchStart
            | HostSignal::Layout { .. }
            | HostSignal::InsertElement { .. }
            | HostSignal::RemoveElement { .. } => {}
        }

        if signal.changes_geometry() {
            self.views.observe(&ctx, &mut self.logger);
        }
    }

    /// Fire every timer due at or before `target`, earliest first
    pub fn advance_to(&mut self, target: DateTime<Utc>) {
        while let Some((deadline, timer)) = self.next_timer() {
            if deadline > target {
                break;
            }
            if deadline > self.clock {
                self.clock = deadline;
            }
            self.fire(timer, deadline);
        }
        if target > self.clock {
            self.clock = target;
        }
    }

    /// Page teardown: emits `unload`, flushes the sink and hands back the
    /// finished session.
    pub fn unload(mut self, now: DateTime<Utc>) -> Session {
        self.advance_to(now);
        let now = self.clock;

        self.section_interval.stop();
        self.idle.stop();

        let session = self.logger.session();
        let data = json!({
            "sessionDuration": session.duration_seconds(now),
            "eventsLogged": session.event_count(),
        });
        let ctx = CaptureContext {
            document: &self.document,
            classifier: &self.classifier,
            now,
        };
        self.logger
            .log_event(&ctx, EventType::Unload, "page closing", data);
        self.logger.flush();

        log::debug!(
            "tracking ended for session {} with {} events",
            self.logger.session().session_id(),
            self.logger.session().event_count()
        );
        self.logger.into_session()
    }

    /// Stop tracking without the unload summary, flushing what was captured
    pub fn into_session(mut self) -> Session {
        self.logger.flush();
        self.logger.into_session()
    }

    fn next_timer(&self) -> Option<(DateTime<Utc>, Timer)> {
        [
            (self.scroll.deadline(), Timer::Scroll),
            (self.resize.deadline(), Timer::Resize),
            (self.hover.deadline(), Timer::Hover),
            (self.section_interval.deadline(), Timer::Section),
            (self.idle.deadline(), Timer::Idle),
        ]
        .into_iter()
        .filter_map(|(deadline, timer)| deadline.map(|d| (d, timer)))
        .min()
    }

    fn fire(&mut self, timer: Timer, at: DateTime<Utc>) {
        let ctx = CaptureContext {
            document: &self.document,
            classifier: &self.classifier,
            now: at,
        };

        match timer {
            Timer::Scroll => {
                if self.scroll.take_due(at) {
                    self.sections.check(&ctx, &mut self.logger);
                    self.scroll.report_position(&ctx, &mut self.logger);
                }
            }
            Timer::Resize => self.resize.on_timer(&ctx, &mut self.logger),
            Timer::Hover => self.hover.on_timer(&ctx, &mut self.logger),
            Timer::Section => {
                if self.section_interval.fire_if_due(at).is_some() {
                    self.sections.check(&ctx, &mut self.logger);
                    if self.scroll.is_scrolling() {
                        self.scroll.report_position(&ctx, &mut self.logger);
                    }
                }
            }
            Timer::Idle => self.idle.on_timer(&ctx, &mut self.logger),
        }
    }

    fn apply_to_document(&mut self, signal: &HostSignal) {
        match signal {
            HostSignal::Scroll { y } => self.document.scroll_y = y.max(0.0),
            HostSignal::Resize { width, height } => {
                self.document.viewport = Size::new(*width, *height)
            }
            HostSignal::VisibilityChange { hidden } => self.document.hidden = *hidden,
            HostSignal::Layout { node, rect } => {
                if !self.document.set_rect(*node, *rect) {
                    log::debug!("layout for unknown node {:?} ignored", node);
                }
            }
            HostSignal::InsertElement { element } => self.document.insert(element.clone()),
            HostSignal::RemoveElement { node } => {
                if self.document.remove(*node).is_none() {
                    log::debug!("removal of unknown node {:?} ignored", node);
                }
            }
            _ => {}
        }
    }
}
