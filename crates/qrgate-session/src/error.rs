//! Error types for the qrgate session store.

use thiserror::Error;

/// Result type alias for session store operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors returned by session store writes.
///
/// Only input validation can fail a write; everything else is reported
/// through the operation's outcome type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Errors produced while turning a QR payload into an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("qr encoding failed: {0}")]
    Encode(String),

    #[error("render task failed: {0}")]
    Join(String),
}
