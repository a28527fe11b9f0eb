//! Idle / active tracking
//!
//! State machine per session:
//!
//! ```text
//! Active --(idle > inactive)--> Inactive --(idle > away)--> Away
//!    ^                                                       |
//!    +-------------------- any activity ---------------------+
//! ```
//!
//! Ticks only move forward through the states, so each threshold crossing is
//! reported once. Activity resets to Active from any state.

use crate::config::TrackerConfig;
use crate::logger::{CaptureContext, EventLogger};
use crate::schedule::Interval;
use crate::types::EventType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdleState {
    Active,
    Inactive,
    Away,
}

#[derive(Debug, Clone)]
pub struct IdleWatcher {
    tick: Interval,
    state: IdleState,
    inactive_secs: f64,
    away_secs: f64,
    return_min_secs: f64,
}

impl IdleWatcher {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            tick: Interval::new(TrackerConfig::millis(config.idle_tick_ms)),
            state: IdleState::Active,
            inactive_secs: config.idle_inactive_secs,
            away_secs: config.idle_away_secs,
            return_min_secs: config.active_return_min_idle_secs,
        }
    }

    pub fn state(&self) -> IdleState {
        self.state
    }

    pub fn start(&mut self, now: DateTime<Utc>) {
        self.tick.start(now);
    }

    pub fn stop(&mut self) {
        self.tick.stop();
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.tick.deadline()
    }

    /// Recompute idle time and report threshold crossings
    pub fn on_timer(&mut self, ctx: &CaptureContext<'_>, logger: &mut EventLogger) {
        if self.tick.fire_if_due(ctx.now).is_none() {
            return;
        }

        let idle = logger.session().idle_seconds(ctx.now);
        logger.session_mut().idle_time = idle;

        if self.state == IdleState::Active && idle > self.inactive_secs {
            logger.log_event(
                ctx,
                EventType::Idle,
                "user inactive",
                json!({ "idleSeconds": idle }),
            );
            self.state = IdleState::Inactive;
        }
        if self.state == IdleState::Inactive && idle > self.away_secs {
            logger.log_event(
                ctx,
                EventType::Idle,
                "user away",
                json!({ "idleSeconds": idle }),
            );
            self.state = IdleState::Away;
        }
    }

    /// Pointer move, key press, click, touch or scroll at `ctx.now`
    pub fn on_activity(&mut self, ctx: &CaptureContext<'_>, logger: &mut EventLogger) {
        let idle = logger.session().idle_seconds(ctx.now);
        if idle > self.return_min_secs {
            logger.log_event(
                ctx,
                EventType::Active,
                "user returned",
                json!({ "afterIdleSeconds": idle }),
            );
        }
        self.reset(ctx.now, logger);
    }

    /// Reset to Active without reporting a return
    pub fn resume(&mut self, now: DateTime<Utc>, logger: &mut EventLogger) {
        self.reset(now, logger);
    }

    fn reset(&mut self, now: DateTime<Utc>, logger: &mut EventLogger) {
        logger.session_mut().touch(now);
        self.state = IdleState::Active;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ElementClassifier;
    use crate::dom::Document;
    use crate::watchers::test_support::{at, ctx, logger, of_type, page, t0};

    fn run_ticks(
        watcher: &mut IdleWatcher,
        log: &mut EventLogger,
        doc: &Document,
        until: DateTime<Utc>,
    ) {
        let classifier = ElementClassifier::default();
        while let Some(deadline) = watcher.deadline() {
            if deadline > until {
                break;
            }
            watcher.on_timer(&ctx(doc, &classifier, deadline), log);
        }
    }

    fn labels(log: &EventLogger) -> Vec<String> {
        log.session()
            .events()
            .iter()
            .map(|e| format!("{}, {}", e.event_type, e.element))
            .collect()
    }

    #[test]
    fn test_forty_seconds_idle_reports_each_threshold_once() {
        let mut watcher = IdleWatcher::new(&TrackerConfig::default());
        let mut log = logger();
        let doc = page();
        watcher.start(t0());

        run_ticks(&mut watcher, &mut log, &doc, at(40_000));
        run_ticks(&mut watcher, &mut log, &doc, at(90_000));

        assert_eq!(labels(&log), vec!["idle, user inactive", "idle, user away"]);
        let idle = of_type(&log, EventType::Idle);
        assert_eq!(idle[0].additional_data["idleSeconds"], 6.0);
        assert_eq!(idle[1].additional_data["idleSeconds"], 31.0);
        assert_eq!(watcher.state(), IdleState::Away);
        assert_eq!(log.session().idle_time, 90.0);
    }

    #[test]
    fn test_activity_after_idle_reports_return_once() {
        let mut watcher = IdleWatcher::new(&TrackerConfig::default());
        let mut log = logger();
        let doc = page();
        let classifier = ElementClassifier::default();
        watcher.start(t0());

        run_ticks(&mut watcher, &mut log, &doc, at(7_200));
        watcher.on_activity(&ctx(&doc, &classifier, at(7_200)), &mut log);
        watcher.on_activity(&ctx(&doc, &classifier, at(7_300)), &mut log);

        let active = of_type(&log, EventType::Active);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].element, "user returned");
        assert_eq!(active[0].additional_data["afterIdleSeconds"], 7.2);
        assert_eq!(log.session().idle_time, 0.0);
        assert_eq!(log.session().last_activity, at(7_300));
        assert_eq!(watcher.state(), IdleState::Active);
    }

    #[test]
    fn test_return_reported_before_inactive_threshold() {
        let mut watcher = IdleWatcher::new(&TrackerConfig::default());
        let mut log = logger();
        let doc = page();
        let classifier = ElementClassifier::default();
        watcher.start(t0());

        run_ticks(&mut watcher, &mut log, &doc, at(4_000));
        watcher.on_activity(&ctx(&doc, &classifier, at(4_000)), &mut log);

        assert_eq!(labels(&log), vec!["active, user returned"]);
    }

    #[test]
    fn test_short_pause_is_not_a_return() {
        let mut watcher = IdleWatcher::new(&TrackerConfig::default());
        let mut log = logger();
        let doc = page();
        let classifier = ElementClassifier::default();
        watcher.start(t0());

        watcher.on_activity(&ctx(&doc, &classifier, at(2_999)), &mut log);
        watcher.on_activity(&ctx(&doc, &classifier, at(6_000)), &mut log);

        assert_eq!(log.session().event_count(), 1);
        assert_eq!(of_type(&log, EventType::Active)[0].additional_data["afterIdleSeconds"], 3.001);
    }

    #[test]
    fn test_thresholds_rearm_after_activity() {
        let mut watcher = IdleWatcher::new(&TrackerConfig::default());
        let mut log = logger();
        let doc = page();
        let classifier = ElementClassifier::default();
        watcher.start(t0());

        run_ticks(&mut watcher, &mut log, &doc, at(10_000));
        watcher.on_activity(&ctx(&doc, &classifier, at(10_500)), &mut log);
        run_ticks(&mut watcher, &mut log, &doc, at(20_000));

        assert_eq!(
            labels(&log),
            vec!["idle, user inactive", "active, user returned", "idle, user inactive"]
        );
    }

    #[test]
    fn test_long_gap_crosses_both_thresholds_in_one_tick() {
        let config = TrackerConfig {
            idle_tick_ms: 60_000,
            ..TrackerConfig::default()
        };
        let mut watcher = IdleWatcher::new(&config);
        let mut log = logger();
        let doc = page();
        watcher.start(t0());

        run_ticks(&mut watcher, &mut log, &doc, at(60_000));
        assert_eq!(labels(&log), vec!["idle, user inactive", "idle, user away"]);
    }

    #[test]
    fn test_resume_is_silent() {
        let mut watcher = IdleWatcher::new(&TrackerConfig::default());
        let mut log = logger();
        let doc = page();
        watcher.start(t0());

        run_ticks(&mut watcher, &mut log, &doc, at(8_000));
        watcher.resume(at(8_000), &mut log);

        assert_eq!(labels(&log), vec!["idle, user inactive"]);
        assert_eq!(watcher.state(), IdleState::Active);
    }
}
