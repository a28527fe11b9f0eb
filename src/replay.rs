//! Scenario replay
//!
//! Drives a tracker from a recorded page and a list of timestamped host
//! signals, producing the finished session. This is the programmatic
//! entry point used by the CLI and the C boundary.

use crate::config::TrackerConfig;
use crate::dom::Document;
use crate::error::TrackError;
use crate::signal::TimedSignal;
use crate::sink::{ConsoleSink, EventSink};
use crate::tracker::PageTracker;
use crate::types::Session;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn default_unload() -> bool {
    true
}

/// A recorded page visit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub page: Document,
    #[serde(default)]
    pub config: TrackerConfig,
    /// Page-ready instant
    pub start: DateTime<Utc>,
    /// Host signals in dispatch order
    #[serde(default)]
    pub signals: Vec<TimedSignal>,
    /// Let timers run until this instant after the last signal
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    /// Emit the unload summary when the scenario ends
    #[serde(default = "default_unload")]
    pub unload: bool,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self, TrackError> {
        serde_json::from_str(json).map_err(|e| TrackError::ParseError(e.to_string()))
    }

    /// Instant the scenario finishes at
    pub fn finish_at(&self) -> DateTime<Utc> {
        let last = self.signals.last().map(|s| s.at).unwrap_or(self.start);
        match self.end {
            Some(end) if end > last => end,
            _ => last,
        }
    }

    /// Every problem found in the scenario, in the order checks run
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if let Err(e) = self.config.validate() {
            issues.push(e.to_string());
        }

        let mut ids = HashSet::new();
        for element in &self.page.elements {
            if !ids.insert(element.id) {
                issues.push(format!("duplicate element id {}", element.id.0));
            }
            if !element.rect.is_finite() {
                issues.push(format!("element {} has non-finite geometry", element.id.0));
            }
        }
        if self.page.viewport.width == 0 || self.page.viewport.height == 0 {
            issues.push("viewport must have a non-zero size".to_string());
        }

        let mut previous = self.start;
        for (index, timed) in self.signals.iter().enumerate() {
            if timed.at < self.start {
                issues.push(format!("signal {} is dispatched before start", index));
            } else if timed.at < previous {
                issues.push(format!("signal {} is out of order", index));
            }
            previous = previous.max(timed.at);
        }

        if let Some(end) = self.end {
            if end < previous {
                issues.push("end precedes the last signal".to_string());
            }
        }

        issues
    }

    /// Reject scenarios that cannot be replayed faithfully
    pub fn validate(&self) -> Result<(), TrackError> {
        match self.issues().into_iter().next() {
            Some(issue) => Err(TrackError::InvalidScenario(issue)),
            None => Ok(()),
        }
    }
}

/// Replay a scenario, reporting events through the `log` facade
pub fn replay(scenario: &Scenario) -> Result<Session, TrackError> {
    replay_into(scenario, Box::new(ConsoleSink::new()))
}

/// Replay a scenario into a caller-supplied sink
pub fn replay_into(scenario: &Scenario, sink: Box<dyn EventSink>) -> Result<Session, TrackError> {
    scenario.validate()?;

    let mut tracker = PageTracker::start(
        scenario.page.clone(),
        scenario.config.clone(),
        sink,
        scenario.start,
    )?;
    for timed in &scenario.signals {
        tracker.dispatch(timed.signal.clone(), timed.at);
    }

    let finish = scenario.finish_at();
    tracker.advance_to(finish);

    let session = if scenario.unload {
        tracker.unload(finish)
    } else {
        tracker.into_session()
    };
    log::debug!(
        "replayed {} signals into {} events",
        scenario.signals.len(),
        session.event_count()
    );
    Ok(session)
}

/// Replay a JSON scenario and return the session as JSON.
///
/// # Example
/// ```ignore
/// let session_json = replay_to_json(std::fs::read_to_string("visit.json")?)?;
/// ```
pub fn replay_to_json(scenario_json: String) -> Result<String, TrackError> {
    let scenario = Scenario::from_json(&scenario_json)?;
    let session = replay(&scenario)?;
    Ok(serde_json::to_string(&session)?)
}
