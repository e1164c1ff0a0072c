//! Domain models handed to callers of the proxy

mod backing_image;
mod backup;

pub use backing_image::{
    BackingImage, BackingImageChangeEvent, BackingImageCollection, BackingImageState,
};
pub use backup::{BackupRequest, DEFAULT_BACKUP_CONCURRENT_LIMIT, DEFAULT_COMPRESSION_METHOD};
