//! Deadline-bounded unary calls

use std::sync::Arc;
use std::time::Duration;

use backing_image_core::{ProxyChannel, WireRequest, WireResponse};
use tracing::debug;

use crate::error::{ProxyError, Result};

/// Runs one request/response round trip through the channel under the
/// service call timeout
#[derive(Clone)]
pub(crate) struct UnaryExecutor {
    channel: Arc<dyn ProxyChannel>,
    timeout: Duration,
}

impl UnaryExecutor {
    pub fn new(channel: Arc<dyn ProxyChannel>, timeout: Duration) -> Self {
        Self { channel, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn channel(&self) -> &Arc<dyn ProxyChannel> {
        &self.channel
    }

    /// Invoke `request`; `target` names the identifiers involved for
    /// error context.
    ///
    /// On expiry the in-flight call future is dropped; aborting the
    /// underlying connection is the channel's business.
    pub async fn call(&self, request: WireRequest, target: &str) -> Result<WireResponse> {
        let operation = request.operation();
        debug!(%operation, target, "Dispatching request");

        let invoke = self.channel.invoke(request, self.timeout);
        match tokio::time::timeout(self.timeout, invoke).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(ProxyError::from_channel(operation, target, self.timeout, e)),
            Err(_) => Err(ProxyError::Timeout {
                operation,
                target: target.to_string(),
                timeout: self.timeout,
            }),
        }
    }
}
