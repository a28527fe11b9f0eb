//! Visibility engine
//!
//! Two cooperating passes over the trackable elements:
//! - breakpoint-based intersection tracking (`view` entering/leaving events)
//! - most-visible-section tracking (`viewing` events)
//!
//! plus the viewport snapshot attached to every event. Elements are
//! enumerated fresh on every pass so inserted and removed nodes are honored.

use crate::classifier::ElementClassifier;
use crate::config::TrackerConfig;
use crate::dom::{Document, Element, NodeId, Rect, Size};
use crate::logger::{CaptureContext, EventLogger};
use crate::types::{round2, EventType, Viewport, VisibleElement};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

/// Fraction of the element's height inside `[0, viewport_height]`.
///
/// Zero-height elements yield 0; non-finite geometry yields `None`.
pub fn height_ratio(rect: &Rect, viewport_height: f64) -> Option<f64> {
    if !rect.is_finite() || !viewport_height.is_finite() {
        return None;
    }
    if rect.height <= 0.0 {
        return Some(0.0);
    }
    let visible = (rect.bottom().min(viewport_height) - rect.top().max(0.0)).clamp(0.0, rect.height);
    Some(visible / rect.height)
}

/// Fraction of the element's area inside the viewport
pub fn intersection_ratio(rect: &Rect, viewport: Size) -> Option<f64> {
    if !rect.is_finite() {
        return None;
    }
    let area = rect.width * rect.height;
    if area <= 0.0 {
        return Some(0.0);
    }
    let visible_width = (rect.right().min(viewport.width as f64) - rect.left().max(0.0)).max(0.0);
    let visible_height = (rect.bottom().min(viewport.height as f64) - rect.top().max(0.0)).max(0.0);
    Some((visible_width * visible_height / area).clamp(0.0, 1.0))
}

/// Trackable elements whose height ratio exceeds `min_ratio`
pub fn snapshot(
    document: &Document,
    classifier: &ElementClassifier,
    track_class: &str,
    min_ratio: f64,
) -> Viewport {
    let viewport_height = document.viewport.height as f64;
    let visible_elements = document
        .trackable(track_class)
        .filter_map(|element| {
            let ratio = checked_height_ratio(document, element, viewport_height)?;
            (ratio > min_ratio).then(|| VisibleElement {
                element: classifier.describe(element),
                visibility_ratio: round2(ratio),
            })
        })
        .collect();

    Viewport {
        width: document.viewport.width,
        height: document.viewport.height,
        visible_elements,
    }
}

fn checked_height_ratio(document: &Document, element: &Element, viewport_height: f64) -> Option<f64> {
    let ratio = height_ratio(&document.client_rect(element), viewport_height);
    if ratio.is_none() {
        log::debug!("skipping node {:?}: non-finite geometry", element.id);
    }
    ratio
}

fn rect_json(rect: &Rect) -> Value {
    json!({
        "x": rect.x,
        "y": rect.y,
        "width": rect.width,
        "height": rect.height,
        "top": rect.top(),
        "right": rect.right(),
        "bottom": rect.bottom(),
        "left": rect.left(),
    })
}

/// Emits `view` events when an element crosses an intersection breakpoint
#[derive(Debug, Clone)]
pub struct IntersectionWatcher {
    thresholds: Vec<f64>,
    track_class: String,
    /// Breakpoints met and whether the element intersects at all
    states: HashMap<NodeId, (usize, bool)>,
}

impl IntersectionWatcher {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            thresholds: config.view_thresholds.clone(),
            track_class: config.track_class.clone(),
            states: HashMap::new(),
        }
    }

    fn bucket(&self, ratio: f64) -> usize {
        self.thresholds.iter().filter(|t| ratio >= **t).count()
    }

    /// Re-evaluate every trackable element against the breakpoints
    pub fn observe(&mut self, ctx: &CaptureContext<'_>, logger: &mut EventLogger) {
        let document = ctx.document;
        let mut seen = HashSet::new();

        for element in document.trackable(&self.track_class) {
            seen.insert(element.id);
            let rect = document.client_rect(element);
            let Some(ratio) = intersection_ratio(&rect, document.viewport) else {
                log::debug!("skipping node {:?}: non-finite geometry", element.id);
                continue;
            };

            let bucket = self.bucket(ratio);
            let intersecting = ratio > 0.0;
            let (previous, was_intersecting) = self
                .states
                .insert(element.id, (bucket, intersecting))
                .unwrap_or((0, false));

            let description = ctx.classifier.describe(element);
            if intersecting && (bucket != previous || !was_intersecting) {
                logger.log_event(
                    ctx,
                    EventType::View,
                    format!("{} (entering view)", description),
                    json!({
                        "visibilityRatio": round2(ratio),
                        "boundingRect": rect_json(&rect),
                    }),
                );
            } else if !intersecting && was_intersecting {
                logger.log_event(
                    ctx,
                    EventType::View,
                    format!("{} (leaving view)", description),
                    json!({
                        "visibilityRatio": 0,
                        "boundingRect": rect_json(&rect),
                    }),
                );
            }
        }

        self.states.retain(|id, _| seen.contains(id));
    }
}

/// Tracks which trackable element is currently the most visible
#[derive(Debug, Clone)]
pub struct SectionWatcher {
    min_ratio: f64,
    track_class: String,
    current: Option<NodeId>,
    checks: u64,
}

impl SectionWatcher {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            min_ratio: config.most_visible_min_ratio,
            track_class: config.track_class.clone(),
            current: None,
            checks: 0,
        }
    }

    /// Element last reported as most visible
    pub fn current(&self) -> Option<NodeId> {
        self.current
    }

    /// Number of checks run so far
    pub fn checks(&self) -> u64 {
        self.checks
    }

    /// Pick the element with the strictly greatest height ratio above the
    /// cutoff; emit `viewing` when it differs from the remembered one.
    pub fn check(&mut self, ctx: &CaptureContext<'_>, logger: &mut EventLogger) {
        self.checks += 1;
        let document = ctx.document;
        let viewport_height = document.viewport.height as f64;

        let mut best: Option<(&Element, f64)> = None;
        for element in document.trackable(&self.track_class) {
            let Some(ratio) = checked_height_ratio(document, element, viewport_height) else {
                continue;
            };
            let best_ratio = best.map(|(_, r)| r).unwrap_or(0.0);
            if ratio > best_ratio && ratio > self.min_ratio {
                best = Some((element, ratio));
            }
        }

        if let Some((element, ratio)) = best.filter(|(e, _)| self.current != Some(e.id)) {
            logger.log_event(
                ctx,
                EventType::Viewing,
                format!("{} (most visible)", ctx.classifier.describe(element)),
                json!({ "visibilityRatio": round2(ratio) }),
            );
            self.current = Some(element.id);
        }
    }
}
