//! backing-image-core - Core traits and types for backing image proxies
//!
//! This crate provides the domain models, wire message shapes and the RPC
//! channel abstraction shared by the proxy client and any transport that
//! carries its requests to the data plane.

pub mod channel;
pub mod error;
pub mod models;
pub mod wire;

pub use channel::{ProxyChannel, WireEventStream};
pub use error::{ChannelError, ChannelResult};
pub use models::*;
pub use wire::{
    BackingImageResponse, BackupCreateRequest, CreateRequest, DeleteRequest, GetRequest,
    ListResponse, Operation, WatchRequest, WireRequest, WireResponse,
};
