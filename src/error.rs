//! Error types for pagewatch

use thiserror::Error;

/// Errors that can occur while configuring or driving a tracker
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("Unknown node: {0}")]
    UnknownNode(u64),

    #[error("Sink error: {0}")]
    SinkError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
