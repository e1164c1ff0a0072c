//! Wire message shapes exchanged with the data plane
//!
//! These mirror the remote service's request and response messages one to
//! one. Fields the service may omit carry `#[serde(default)]` so a channel
//! decoding them from JSON or another self-describing format accepts
//! partial messages; the proxy client decides which omissions are fatal.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Remote operation names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    BackingImageCreate,
    BackingImageDelete,
    BackingImageGet,
    BackingImageList,
    BackingImageWatch,
    BackingImageBackupCreate,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::BackingImageCreate => "BackingImageCreate",
            Operation::BackingImageDelete => "BackingImageDelete",
            Operation::BackingImageGet => "BackingImageGet",
            Operation::BackingImageList => "BackingImageList",
            Operation::BackingImageWatch => "BackingImageWatch",
            Operation::BackingImageBackupCreate => "BackingImageBackupCreate",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub name: String,
    pub backing_image_uuid: String,
    pub disk_uuid: String,
    pub size: u64,
    pub checksum: String,
    #[serde(default)]
    pub from_address: String,
    #[serde(default)]
    pub src_lvs_uuid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub name: String,
    pub disk_uuid: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    pub name: String,
    pub disk_uuid: String,
}

/// Watch takes no arguments; the service streams every backing image
/// visible to the node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRequest {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupCreateRequest {
    pub backup_name: String,
    pub name: String,
    pub uuid: String,
    pub lvs_uuid: String,
    pub checksum: String,
    pub backup_target: String,
    /// Labels flattened to `key=value` entries
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub credential: HashMap<String, String>,
    #[serde(default)]
    pub compression_method: String,
    #[serde(default)]
    pub concurrent_limit: i32,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

/// A backing image as reported by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackingImageResponse {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub backing_image_uuid: String,
    #[serde(default)]
    pub disk_uuid: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub checksum: String,
    #[serde(default)]
    pub from_address: String,
    #[serde(default)]
    pub src_lvs_uuid: String,
    #[serde(default)]
    pub lvs_name: String,
    #[serde(default)]
    pub lvs_uuid: String,
    #[serde(default)]
    pub progress: i32,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub current_checksum: String,
    #[serde(default)]
    pub error_msg: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse {
    #[serde(default)]
    pub backing_images: HashMap<String, BackingImageResponse>,
}

/// Request envelope for unary operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "request")]
pub enum WireRequest {
    Create(CreateRequest),
    Delete(DeleteRequest),
    Get(GetRequest),
    List,
    BackupCreate(BackupCreateRequest),
}

impl WireRequest {
    /// Remote operation this request targets
    pub fn operation(&self) -> Operation {
        match self {
            WireRequest::Create(_) => Operation::BackingImageCreate,
            WireRequest::Delete(_) => Operation::BackingImageDelete,
            WireRequest::Get(_) => Operation::BackingImageGet,
            WireRequest::List => Operation::BackingImageList,
            WireRequest::BackupCreate(_) => Operation::BackingImageBackupCreate,
        }
    }
}

/// Response envelope for unary operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "response")]
pub enum WireResponse {
    BackingImage(BackingImageResponse),
    List(ListResponse),
    /// Acknowledgement with no payload
    Empty,
}

impl WireResponse {
    /// Short name of the envelope variant, for error messages
    pub fn variant_name(&self) -> &'static str {
        match self {
            WireResponse::BackingImage(_) => "backing image",
            WireResponse::List(_) => "list",
            WireResponse::Empty => "empty",
        }
    }
}
