//! Errors reported by RPC channel implementations

use thiserror::Error;

/// Result type for channel operations
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Errors a channel reports for a unary call or a watch subscription
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The remote service does not know the requested resource
    #[error("Not found: {0}")]
    NotFound(String),

    /// The channel gave up waiting for the remote service
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// The remote service could not be reached
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// The connection or stream was closed underneath the call
    #[error("Connection closed")]
    ConnectionClosed,

    /// Any other status reported by the remote service
    #[error("Status {code}: {message}")]
    Status { code: i32, message: String },

    /// Transport failure that fits no other category
    #[error("{0}")]
    Other(String),
}

impl ChannelError {
    /// Create a status error from a code and message
    pub fn status(code: i32, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }
}
