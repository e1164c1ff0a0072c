//! ProxyChannel trait - the seam between the proxy client and its transport

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures_core::Stream;
use tokio_util::sync::CancellationToken;

use crate::error::ChannelError;
use crate::wire::{BackingImageResponse, WatchRequest, WireRequest, WireResponse};

/// Server-streamed backing image updates as delivered by a channel
pub type WireEventStream =
    Pin<Box<dyn Stream<Item = Result<BackingImageResponse, ChannelError>> + Send>>;

/// Request/response transport to the data-plane service.
///
/// Implementations own connection management. They must be safe for
/// concurrent use: the proxy client shares one channel across every
/// in-flight call and watch subscription and never mutates it.
#[async_trait]
pub trait ProxyChannel: Send + Sync {
    /// Perform a unary call.
    ///
    /// # Arguments
    /// * `request` - The request envelope; its variant names the operation
    /// * `deadline` - How long the caller will wait. The client enforces it
    ///   independently; implementations should use it to abort the
    ///   underlying call once it passes.
    async fn invoke(
        &self,
        request: WireRequest,
        deadline: Duration,
    ) -> Result<WireResponse, ChannelError>;

    /// Open a server-streaming watch subscription.
    ///
    /// The returned stream ends with `None` when the service closes it
    /// cleanly and yields `Err` when the subscription fails. Cancelling
    /// `cancel` must release the underlying call.
    async fn subscribe(
        &self,
        request: WatchRequest,
        cancel: CancellationToken,
    ) -> Result<WireEventStream, ChannelError>;
}
