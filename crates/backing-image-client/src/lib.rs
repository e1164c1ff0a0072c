//! Backing Image Proxy Client
//!
//! Provides a typed façade for managing backing images (immutable base
//! volumes used to seed writable volumes on a node) on a remote data-plane
//! service. Identifiers are validated before anything is sent, every unary
//! call is bounded by a shared service timeout, and state changes can be
//! followed through a long-lived watch stream.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use backing_image_client::testing::FakeChannel;
//! use backing_image_client::{ProxyClient, ProxyConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Any ProxyChannel implementation works; the fake one is in-memory.
//!     let channel = Arc::new(FakeChannel::new());
//!     let config = ProxyConfig::from_yaml("timeouts:\n  service_ms: 30000\n")?;
//!     let client = ProxyClient::with_config(channel, &config);
//!
//!     let image = client
//!         .backing_image_create(
//!             "bi-ubuntu",
//!             "6f0c2f5e",
//!             "disk-1",
//!             "sha512:9f2b",
//!             "",
//!             "",
//!             2_147_483_648,
//!         )
//!         .await?;
//!     println!("{} is {}", image.name, image.state);
//!
//!     for (name, image) in client.backing_image_list().await? {
//!         println!("{} on {}", name, image.disk_uuid);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module provides a scriptable in-memory channel:
//!
//! ```rust,ignore
//! use backing_image_client::testing::TestHarness;
//!
//! let harness = TestHarness::new();
//! let images = harness.client.backing_image_list().await?;
//! assert_eq!(harness.channel.total_calls(), 1);
//! ```

mod client;
mod config;
mod error;
mod executor;
pub mod streaming;
pub mod testing;
mod translate;
mod validate;

pub use client::ProxyClient;
pub use config::{ConfigError, ProxyConfig, ProxyConfigBuilder, TimeoutsConfig};
pub use error::{ErrorKind, ProxyError, Result};
pub use translate::labels_to_wire;
pub use validate::{validate_parameters, ValidationError};

// Re-export streaming types for convenience
pub use streaming::BackingImageStream;

// Re-export core types for convenience
pub use backing_image_core::{
    BackingImage, BackingImageChangeEvent, BackingImageCollection, BackingImageState,
    BackupRequest, ChannelError, Operation, ProxyChannel,
};
