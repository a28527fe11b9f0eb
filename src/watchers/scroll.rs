//! Scroll capture
//!
//! Scroll signals re-arm a short debounce. When it fires the tracker runs a
//! most-visible check and then reports the position: the offset is recorded
//! on the session and, at most once per log interval, emitted as a `scroll`
//! event with its direction. Periodic section checks that land while the
//! debounce is still pending report the position too, so a long continuous
//! scroll is sampled instead of going silent until it stops.

use crate::config::TrackerConfig;
use crate::logger::{CaptureContext, EventLogger};
use crate::schedule::Debounce;
use crate::types::EventType;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct ScrollWatcher {
    settle: Debounce,
    log_interval: Duration,
    last_log: Option<DateTime<Utc>>,
    settled: u64,
}

impl ScrollWatcher {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            settle: Debounce::new(TrackerConfig::millis(config.scroll_debounce_ms)),
            log_interval: TrackerConfig::millis(config.scroll_log_interval_ms),
            last_log: None,
            settled: 0,
        }
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.settle.deadline()
    }

    /// Number of times scrolling settled (one re-check each)
    pub fn settled(&self) -> u64 {
        self.settled
    }

    pub fn on_scroll(&mut self, now: DateTime<Utc>) {
        self.settle.arm(now);
    }

    /// A scroll is in progress while its debounce is pending
    pub fn is_scrolling(&self) -> bool {
        self.settle.is_armed()
    }

    /// True when the debounce has elapsed at `now`; the caller then runs
    /// its visibility re-check followed by [`ScrollWatcher::report_position`].
    pub fn take_due(&mut self, now: DateTime<Utc>) -> bool {
        let due = self.settle.fire_if_due(now).is_some();
        if due {
            self.settled += 1;
        }
        due
    }

    /// Report the position (rate limited) and record it on the session
    pub fn report_position(&mut self, ctx: &CaptureContext<'_>, logger: &mut EventLogger) {
        let offset = ctx.document.scroll_y.round() as i64;
        let previous = logger.session().scroll_position;

        let log_due = match self.last_log {
            Some(last) => ctx.now - last > self.log_interval,
            None => true,
        };
        if log_due {
            let direction = if offset > previous {
                ScrollDirection::Down
            } else {
                ScrollDirection::Up
            };
            let visible_area = serde_json::to_value(logger.snapshot(ctx)).unwrap_or_default();
            logger.log_event(
                ctx,
                EventType::Scroll,
                format!("position {}px", offset),
                json!({ "direction": direction, "visibleArea": visible_area }),
            );
            self.last_log = Some(ctx.now);
        }

        logger.session_mut().scroll_position = offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ElementClassifier;
    use crate::dom::Document;
    use crate::watchers::test_support::{at, ctx, logger, of_type, page};

    fn scroll_to(
        watcher: &mut ScrollWatcher,
        log: &mut EventLogger,
        doc: &mut Document,
        y: f64,
        now: DateTime<Utc>,
    ) {
        doc.scroll_y = y;
        watcher.on_scroll(now);
        let deadline = watcher.deadline().unwrap();
        assert!(watcher.take_due(deadline));
        let classifier = ElementClassifier::default();
        watcher.report_position(&ctx(doc, &classifier, deadline), log);
    }

    #[test]
    fn test_burst_collapses_into_one_settle() {
        let mut watcher = ScrollWatcher::new(&TrackerConfig::default());
        for i in 0..20 {
            watcher.on_scroll(at(i / 2));
        }
        assert!(!watcher.take_due(at(58)));
        assert!(watcher.take_due(at(59)));
        assert!(!watcher.take_due(at(200)));
        assert_eq!(watcher.settled(), 1);
    }

    #[test]
    fn test_direction_follows_recorded_offset() {
        let mut watcher = ScrollWatcher::new(&TrackerConfig::default());
        let mut log = logger();
        let mut doc = page();

        scroll_to(&mut watcher, &mut log, &mut doc, 300.0, at(0));
        scroll_to(&mut watcher, &mut log, &mut doc, 100.0, at(1000));

        let scrolls = of_type(&log, EventType::Scroll);
        assert_eq!(scrolls.len(), 2);
        assert_eq!(scrolls[0].element, "position 300px");
        assert_eq!(scrolls[0].additional_data["direction"], "down");
        assert_eq!(scrolls[1].element, "position 100px");
        assert_eq!(scrolls[1].additional_data["direction"], "up");
        assert!(scrolls[0].additional_data["visibleArea"]["visibleElements"].is_array());
        assert_eq!(log.session().scroll_position, 100);
    }

    #[test]
    fn test_position_logged_at_most_once_per_interval() {
        let mut watcher = ScrollWatcher::new(&TrackerConfig::default());
        let mut log = logger();
        let mut doc = page();

        scroll_to(&mut watcher, &mut log, &mut doc, 100.0, at(0));
        scroll_to(&mut watcher, &mut log, &mut doc, 200.0, at(200));
        scroll_to(&mut watcher, &mut log, &mut doc, 300.0, at(400));
        scroll_to(&mut watcher, &mut log, &mut doc, 400.0, at(700));

        let positions: Vec<String> = of_type(&log, EventType::Scroll)
            .into_iter()
            .map(|e| e.element)
            .collect();
        assert_eq!(positions, vec!["position 100px", "position 400px"]);
        // the offset is still recorded when the event is rate limited
        assert_eq!(log.session().scroll_position, 400);
    }

    #[test]
    fn test_scrolling_until_debounce_fires() {
        let mut watcher = ScrollWatcher::new(&TrackerConfig::default());
        assert!(!watcher.is_scrolling());

        watcher.on_scroll(at(0));
        watcher.on_scroll(at(30));
        assert!(!watcher.take_due(at(60)));
        assert!(watcher.is_scrolling());

        assert!(watcher.take_due(at(80)));
        assert!(!watcher.is_scrolling());
    }

    #[test]
    fn test_mid_scroll_reports_share_the_rate_limit() {
        let mut watcher = ScrollWatcher::new(&TrackerConfig::default());
        let mut log = logger();
        let mut doc = page();
        let classifier = ElementClassifier::default();

        doc.scroll_y = 250.0;
        watcher.on_scroll(at(0));
        watcher.report_position(&ctx(&doc, &classifier, at(20)), &mut log);
        doc.scroll_y = 260.0;
        watcher.on_scroll(at(30));
        assert!(watcher.take_due(at(80)));
        watcher.report_position(&ctx(&doc, &classifier, at(80)), &mut log);

        let positions: Vec<String> = of_type(&log, EventType::Scroll)
            .into_iter()
            .map(|e| e.element)
            .collect();
        assert_eq!(positions, vec!["position 250px"]);
        assert_eq!(log.session().scroll_position, 260);
    }
}
