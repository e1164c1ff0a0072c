//! Watch support for backing image change notifications
//!
//! A watch is a single long-lived server-streaming subscription exposed as
//! a pull-based [`futures::Stream`]. It never reconnects: when it ends the
//! caller opens a new one, and events emitted in between are not replayed.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use backing_image_client::testing::FakeChannel;
//! use backing_image_client::ProxyClient;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ProxyClient::new(Arc::new(FakeChannel::new()));
//! let cancel = CancellationToken::new();
//!
//! let mut stream = client.backing_image_watch(cancel.clone()).await?;
//!
//! while let Some(event) = stream.next().await {
//!     match event {
//!         Ok(event) => {
//!             println!(
//!                 "seq={} {} is {}",
//!                 event.sequence, event.backing_image.name, event.backing_image.state
//!             );
//!         }
//!         Err(e) => {
//!             eprintln!("Watch ended: {}", e);
//!             break;
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod subscription;

pub use subscription::BackingImageStream;
