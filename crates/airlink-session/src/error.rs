use thiserror::Error;

/// Errors surfaced to consumers of a running session.
///
/// Exchange failures never show up here; the session absorbs them and
/// retries.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The write was rejected before being queued
    #[error("Invalid request: {0}")]
    Invalid(#[from] airlink_core::Error),

    /// The session runner has stopped
    #[error("Session stopped")]
    Stopped,
}
