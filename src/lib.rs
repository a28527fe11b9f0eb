//! pagewatch - Behavioral telemetry capture engine for web pages
//!
//! pagewatch turns the signals a host page reports (pointer, keyboard,
//! scroll, resize, visibility and layout changes) into a session of
//! structured interaction events: view and most-visible tracking, clicks,
//! selections, hovers, debounced scroll and resize reports, idle/active
//! transitions and page lifecycle events.
//!
//! ## Modules
//!
//! - **Tracker**: [`PageTracker`] owns the page model and every watcher
//! - **Replay**: drive a tracker from a recorded scenario
//! - **FFI**: C boundary for hosts that own the real page

pub mod classifier;
pub mod config;
pub mod dom;
pub mod error;
pub mod logger;
pub mod replay;
pub mod schedule;
pub mod signal;
pub mod sink;
pub mod tracker;
pub mod types;
pub mod visibility;
pub mod watchers;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use classifier::ElementClassifier;
pub use config::TrackerConfig;
pub use dom::{Document, Element, NodeId, Rect, Size};
pub use error::TrackError;
pub use replay::{replay, replay_to_json, Scenario};
pub use signal::{HostSignal, TimedSignal};
pub use sink::{ConsoleSink, EventSink, MemorySink, NdjsonSink};
pub use tracker::PageTracker;
pub use types::{Event, EventType, Session, Viewport, VisibleElement};

/// pagewatch version
pub const PAGEWATCH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "pagewatch";
