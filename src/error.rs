//! Error types for the invocation pipeline.

use thiserror::Error;

/// Failures inside the invocation pipeline. Every variant is reported to the
/// client as a generic internal error; the detail only goes to the server log.
#[derive(Debug, Error)]
pub enum Error {
    #[error("workspace setup: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("spawning sandbox helper: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("capturing sandbox output: {0}")]
    Capture(#[source] std::io::Error),

    #[error("drainer task died: {0}")]
    Drainer(#[source] tokio::task::JoinError),

    #[error("waiting for sandbox helper: {0}")]
    Wait(#[source] std::io::Error),

    #[error("reading status report: {0}")]
    Status(#[source] std::io::Error),

    #[error("malformed status report: {0}")]
    StatusParse(#[source] serde_json::Error),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
