//! Error types for the keep-alive pinger.

use thiserror::Error;

pub type KeepAliveResult<T> = Result<T, KeepAliveError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeepAliveError {
    #[error("invalid keep-alive url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("keep-alive interval must be non-zero")]
    ZeroInterval,
}
