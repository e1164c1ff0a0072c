//! Error types for backing image proxy operations

use std::time::Duration;

use backing_image_core::{ChannelError, Operation};
use thiserror::Error;

use crate::validate::ValidationError;

/// Result type alias for proxy client operations
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors that can occur during proxy client operations
#[derive(Error, Debug)]
pub enum ProxyError {
    /// One or more required parameters were empty; nothing was sent
    #[error("failed to {action}: {source}")]
    Validation {
        action: &'static str,
        source: ValidationError,
    },

    /// A parameter was present but semantically invalid; nothing was sent
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A numeric parameter does not fit its wire type; nothing was sent
    #[error("{field} {value} is outside the 32-bit signed integer range")]
    Range { field: &'static str, value: i64 },

    /// The service did not answer within the service call timeout
    #[error("{operation} for {target} timed out after {timeout:?}")]
    Timeout {
        operation: Operation,
        target: String,
        timeout: Duration,
    },

    /// The service answered with a malformed response
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The watch subscription terminated abnormally
    #[error("backing image watch stream terminated: {0}")]
    Stream(#[source] ChannelError),

    /// The service reported that the backing image does not exist
    #[error("{operation} for {target}: backing image not found: {message}")]
    NotFound {
        operation: Operation,
        target: String,
        message: String,
    },

    /// Listing backing images failed
    #[error("failed to list backing images: {0}")]
    List(#[source] Box<ProxyError>),

    /// Any other error reported by the service or its channel
    #[error("{operation} for {target} failed: {source}")]
    Backend {
        operation: Operation,
        target: String,
        source: ChannelError,
    },
}

/// Fieldless classification of [`ProxyError`] for callers that branch on
/// the kind of failure rather than its message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    InvalidArgument,
    Range,
    Timeout,
    Decode,
    Stream,
    NotFound,
    List,
    Backend,
}

impl ProxyError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProxyError::Validation { .. } => ErrorKind::Validation,
            ProxyError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            ProxyError::Range { .. } => ErrorKind::Range,
            ProxyError::Timeout { .. } => ErrorKind::Timeout,
            ProxyError::Decode(_) => ErrorKind::Decode,
            ProxyError::Stream(_) => ErrorKind::Stream,
            ProxyError::NotFound { .. } => ErrorKind::NotFound,
            ProxyError::List(_) => ErrorKind::List,
            ProxyError::Backend { .. } => ErrorKind::Backend,
        }
    }

    /// Classify the underlying cause, looking through the `List` wrapper
    ///
    /// A listing that timed out reports `List` from [`kind`](Self::kind)
    /// and `Timeout` from here.
    pub fn root_kind(&self) -> ErrorKind {
        match self {
            ProxyError::List(cause) => cause.root_kind(),
            other => other.kind(),
        }
    }

    /// Whether the error was raised locally, before any network attempt
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            ProxyError::Validation { .. }
                | ProxyError::InvalidArgument(_)
                | ProxyError::Range { .. }
        )
    }

    /// Map a channel failure for `operation` on `target` onto the taxonomy
    pub(crate) fn from_channel(
        operation: Operation,
        target: &str,
        timeout: Duration,
        err: ChannelError,
    ) -> Self {
        match err {
            ChannelError::NotFound(message) => ProxyError::NotFound {
                operation,
                target: target.to_string(),
                message,
            },
            ChannelError::DeadlineExceeded => ProxyError::Timeout {
                operation,
                target: target.to_string(),
                timeout,
            },
            source => ProxyError::Backend {
                operation,
                target: target.to_string(),
                source,
            },
        }
    }
}
