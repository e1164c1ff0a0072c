//! Watch subscription implementation

use std::pin::Pin;
use std::task::{Context, Poll};

use backing_image_core::{BackingImageChangeEvent, WireEventStream};
use futures::stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{ProxyError, Result};
use crate::translate;

/// An active backing image watch
///
/// Implements `Stream<Item = Result<BackingImageChangeEvent, ProxyError>>`.
///
/// # Lifecycle
///
/// - Created via `ProxyClient::backing_image_watch()`
/// - Events are consumed via `next()` or the `Stream` trait
/// - Ends cleanly (`None`) when the caller's token is cancelled or the
///   service closes the stream
/// - Yields one `Err` and then ends when the subscription fails
/// - Dropping the handle or calling `cancel()` releases the subscription
pub struct BackingImageStream {
    /// Scoped to this subscription; cancelled on drop
    token: CancellationToken,

    inner: Pin<Box<dyn Stream<Item = Result<BackingImageChangeEvent>> + Send>>,
}

impl BackingImageStream {
    /// Wrap a channel event stream.
    ///
    /// `token` must be the token the channel subscription was opened with.
    pub(crate) fn new(events: WireEventStream, token: CancellationToken) -> Self {
        let cancelled = token.clone();

        let inner = async_stream::stream! {
            let mut events = events;
            let mut sequence: u64 = 0;

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => {
                        debug!(sequence, "Backing image watch cancelled");
                        break;
                    }
                    next = events.next() => next,
                };

                match next {
                    Some(Ok(resp)) => {
                        sequence += 1;
                        trace!(sequence, name = %resp.name, state = %resp.state, "Backing image event");
                        match translate::event_from_wire(resp, sequence) {
                            Ok(event) => yield Ok(event),
                            Err(e) => {
                                warn!(sequence, "Malformed backing image event: {}", e);
                                yield Err(e);
                                break;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        warn!(sequence, "Backing image watch failed: {}", e);
                        yield Err(ProxyError::Stream(e));
                        break;
                    }
                    None => {
                        debug!(sequence, "Backing image watch closed by service");
                        break;
                    }
                }
            }
        };

        Self {
            token,
            inner: Box::pin(inner),
        }
    }

    /// A stream that has already ended
    pub(crate) fn empty() -> Self {
        let token = CancellationToken::new();
        token.cancel();
        Self {
            token,
            inner: Box::pin(futures::stream::empty()),
        }
    }

    /// Get the next event from the stream
    ///
    /// Returns `None` when the stream ends or is cancelled.
    pub async fn next(&mut self) -> Option<Result<BackingImageChangeEvent>> {
        <Self as StreamExt>::next(self).await
    }

    /// Stop the subscription; subsequent pulls return `None`
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Stream for BackingImageStream {
    type Item = Result<BackingImageChangeEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for BackingImageStream {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl std::fmt::Debug for BackingImageStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackingImageStream")
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}
