//! Event sinks
//!
//! A sink is the external consumer of captured events. Capture never depends
//! on a sink succeeding: the logger reports failures and carries on.

use crate::error::TrackError;
use crate::types::Event;
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// Consumer of captured events
pub trait EventSink {
    /// Receive one event right after it was appended to the session
    fn accept(&mut self, event: &Event) -> Result<(), TrackError>;

    /// Batch hook, called with every event captured so far
    fn flush(&mut self, _events: &[Event]) -> Result<(), TrackError> {
        Ok(())
    }
}

/// Writes a one-line summary of each event through the `log` facade
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for ConsoleSink {
    fn accept(&mut self, event: &Event) -> Result<(), TrackError> {
        log::info!(
            "{}, {}, {} {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            event.event_type,
            event.element,
            serde_json::Value::Object(event.additional_data.clone())
        );
        Ok(())
    }
}

/// Appends each event as one JSON object per line
pub struct NdjsonSink<W: Write> {
    writer: W,
}

impl<W: Write> NdjsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventSink for NdjsonSink<W> {
    fn accept(&mut self, event: &Event) -> Result<(), TrackError> {
        let line = serde_json::to_string(event)?;
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.write_all(b"\n"))
            .map_err(|e| TrackError::SinkError(e.to_string()))
    }

    fn flush(&mut self, _events: &[Event]) -> Result<(), TrackError> {
        self.writer
            .flush()
            .map_err(|e| TrackError::SinkError(e.to_string()))
    }
}

/// What a [`MemorySink`] has seen
#[derive(Debug, Default)]
pub struct MemoryRecord {
    pub accepted: Vec<Event>,
    /// Length of the batch passed to each flush call
    pub flushes: Vec<usize>,
}

/// In-memory sink whose record stays readable through a shared handle
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    record: Rc<RefCell<MemoryRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of everything recorded so far
    pub fn record(&self) -> Rc<RefCell<MemoryRecord>> {
        Rc::clone(&self.record)
    }
}

impl EventSink for MemorySink {
    fn accept(&mut self, event: &Event) -> Result<(), TrackError> {
        self.record.borrow_mut().accepted.push(event.clone());
        Ok(())
    }

    fn flush(&mut self, events: &[Event]) -> Result<(), TrackError> {
        self.record.borrow_mut().flushes.push(events.len());
        Ok(())
    }
}
