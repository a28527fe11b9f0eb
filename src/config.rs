//! Tracker configuration
//!
//! Every threshold and delay used by the capture engine lives here so that
//! embedders can tune behavior without touching capture logic. All fields are
//! defaulted, so a partial JSON document is a valid configuration.

use crate::error::TrackError;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Default marker class for elements opted into visibility tracking
pub const DEFAULT_TRACK_CLASS: &str = "track-view";

/// Default attribute carrying an application-assigned tracking identifier
pub const DEFAULT_TRACK_ID_ATTRIBUTE: &str = "data-track-id";

/// Tunable thresholds, delays and limits for a [`crate::PageTracker`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Intersection breakpoints for `view` events (ascending, within (0, 1])
    pub view_thresholds: Vec<f64>,
    /// An element must exceed this height ratio to become the most visible section
    pub most_visible_min_ratio: f64,
    /// Elements above this height ratio are listed in every viewport snapshot
    pub snapshot_min_ratio: f64,
    pub scroll_debounce_ms: i64,
    /// Minimum spacing between two `scroll` position events
    pub scroll_log_interval_ms: i64,
    pub hover_delay_ms: i64,
    pub resize_debounce_ms: i64,
    pub section_check_interval_ms: i64,
    pub idle_tick_ms: i64,
    /// Idle seconds after which `idle, user inactive` fires
    pub idle_inactive_secs: f64,
    /// Idle seconds after which `idle, user away` fires
    pub idle_away_secs: f64,
    /// Activity after more than this many idle seconds emits `active, user returned`
    pub active_return_min_idle_secs: f64,
    /// Every n-th appended event triggers a sink flush
    pub flush_every: usize,
    pub click_text_limit: usize,
    pub selection_text_limit: usize,
    pub track_class: String,
    pub track_id_attribute: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            view_thresholds: vec![0.1, 0.25, 0.5, 0.9],
            most_visible_min_ratio: 0.3,
            snapshot_min_ratio: 0.1,
            scroll_debounce_ms: 50,
            scroll_log_interval_ms: 500,
            hover_delay_ms: 500,
            resize_debounce_ms: 250,
            section_check_interval_ms: 1000,
            idle_tick_ms: 1000,
            idle_inactive_secs: 5.0,
            idle_away_secs: 30.0,
            active_return_min_idle_secs: 3.0,
            flush_every: 10,
            click_text_limit: 50,
            selection_text_limit: 50,
            track_class: DEFAULT_TRACK_CLASS.to_string(),
            track_id_attribute: DEFAULT_TRACK_ID_ATTRIBUTE.to_string(),
        }
    }
}

impl TrackerConfig {
    /// Parse a configuration from JSON and validate it
    pub fn from_json(json: &str) -> Result<Self, TrackError> {
        let config: TrackerConfig = serde_json::from_str(json)
            .map_err(|e| TrackError::ParseError(format!("Failed to parse tracker config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that thresholds and delays are usable
    pub fn validate(&self) -> Result<(), TrackError> {
        if self.view_thresholds.is_empty() {
            return Err(TrackError::InvalidConfig(
                "view_thresholds must not be empty".to_string(),
            ));
        }
        if self
            .view_thresholds
            .iter()
            .any(|t| !t.is_finite() || *t <= 0.0 || *t > 1.0)
        {
            return Err(TrackError::InvalidConfig(
                "view_thresholds must lie in (0, 1]".to_string(),
            ));
        }
        if self.view_thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TrackError::InvalidConfig(
                "view_thresholds must be strictly ascending".to_string(),
            ));
        }

        for (name, ratio) in [
            ("most_visible_min_ratio", self.most_visible_min_ratio),
            ("snapshot_min_ratio", self.snapshot_min_ratio),
        ] {
            if !(0.0..1.0).contains(&ratio) {
                return Err(TrackError::InvalidConfig(format!(
                    "{} must lie in [0, 1)",
                    name
                )));
            }
        }

        for (name, ms) in [
            ("scroll_debounce_ms", self.scroll_debounce_ms),
            ("hover_delay_ms", self.hover_delay_ms),
            ("resize_debounce_ms", self.resize_debounce_ms),
            ("section_check_interval_ms", self.section_check_interval_ms),
            ("idle_tick_ms", self.idle_tick_ms),
        ] {
            if ms <= 0 {
                return Err(TrackError::InvalidConfig(format!(
                    "{} must be positive",
                    name
                )));
            }
        }
        if self.scroll_log_interval_ms < 0 {
            return Err(TrackError::InvalidConfig(
                "scroll_log_interval_ms must not be negative".to_string(),
            ));
        }

        if self.idle_inactive_secs <= 0.0 || self.idle_inactive_secs >= self.idle_away_secs {
            return Err(TrackError::InvalidConfig(
                "idle thresholds must satisfy 0 < inactive < away".to_string(),
            ));
        }
        if self.active_return_min_idle_secs < 0.0 {
            return Err(TrackError::InvalidConfig(
                "active_return_min_idle_secs must not be negative".to_string(),
            ));
        }

        if self.flush_every == 0 {
            return Err(TrackError::InvalidConfig(
                "flush_every must be at least 1".to_string(),
            ));
        }
        if self.track_class.trim().is_empty() || self.track_id_attribute.trim().is_empty() {
            return Err(TrackError::InvalidConfig(
                "track_class and track_id_attribute must be set".to_string(),
            ));
        }

        Ok(())
    }

    pub(crate) fn millis(ms: i64) -> Duration {
        Duration::milliseconds(ms)
    }
}
