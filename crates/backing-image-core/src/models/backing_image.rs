//! Backing image models

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Lifecycle state reported by the data plane for a backing image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackingImageState {
    /// Accepted, not yet being populated
    Pending,
    /// Preparing the backing logical volume
    Starting,
    /// Content is being transferred or cloned
    InProgress,
    /// Content is complete and verified
    Ready,
    /// Preparation failed; see `error_msg`
    Failed,
    /// State string was empty or not recognised
    #[default]
    Unknown,
}

impl BackingImageState {
    /// Wire representation of this state
    pub fn as_str(&self) -> &'static str {
        match self {
            BackingImageState::Pending => "pending",
            BackingImageState::Starting => "starting",
            BackingImageState::InProgress => "in-progress",
            BackingImageState::Ready => "ready",
            BackingImageState::Failed => "failed",
            BackingImageState::Unknown => "unknown",
        }
    }

    /// Parse a wire state string.
    ///
    /// Never fails: states added by newer data planes map to `Unknown`.
    pub fn from_wire(s: &str) -> Self {
        match s {
            "pending" => BackingImageState::Pending,
            "starting" => BackingImageState::Starting,
            "in-progress" | "in_progress" => BackingImageState::InProgress,
            "ready" => BackingImageState::Ready,
            "failed" => BackingImageState::Failed,
            _ => BackingImageState::Unknown,
        }
    }
}

impl std::fmt::Display for BackingImageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable, content-addressed base volume on one disk.
///
/// Only `state` (and the progress fields that accompany it) change over
/// the image's lifetime, and only the data plane changes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackingImage {
    /// Name, unique within a disk
    pub name: String,
    pub backing_image_uuid: String,
    /// Disk hosting this copy of the image
    pub disk_uuid: String,
    /// Payload size in bytes
    pub size: u64,
    /// Expected content checksum
    pub checksum: String,
    /// Address the content was pulled from, if any
    #[serde(default)]
    pub from_address: String,
    /// Source logical volume store when cloning
    #[serde(default)]
    pub src_lvs_uuid: String,
    #[serde(default)]
    pub lvs_name: String,
    #[serde(default)]
    pub lvs_uuid: String,
    /// Preparation progress, 0-100
    #[serde(default)]
    pub progress: i32,
    /// Checksum of the content prepared so far
    #[serde(default)]
    pub current_checksum: String,
    #[serde(default)]
    pub error_msg: String,
    pub state: BackingImageState,
}

impl BackingImage {
    pub fn is_ready(&self) -> bool {
        self.state == BackingImageState::Ready
    }

    pub fn is_failed(&self) -> bool {
        self.state == BackingImageState::Failed
    }
}

/// Backing images on a node, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackingImageCollection(HashMap<String, BackingImage>);

impl BackingImageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an image under its own name, returning any image it replaced
    pub fn insert(&mut self, image: BackingImage) -> Option<BackingImage> {
        self.0.insert(image.name.clone(), image)
    }

    pub fn get(&self, name: &str) -> Option<&BackingImage> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Image names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.0.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BackingImage)> {
        self.0.iter()
    }

    pub fn into_inner(self) -> HashMap<String, BackingImage> {
        self.0
    }
}

impl From<HashMap<String, BackingImage>> for BackingImageCollection {
    fn from(map: HashMap<String, BackingImage>) -> Self {
        Self(map)
    }
}

impl IntoIterator for BackingImageCollection {
    type Item = (String, BackingImage);
    type IntoIter = std::collections::hash_map::IntoIter<String, BackingImage>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Point-in-time snapshot of one backing image, delivered by a watch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackingImageChangeEvent {
    /// Position of this event within its subscription, starting at 1
    #[serde(rename = "seq")]
    pub sequence: u64,
    pub backing_image: BackingImage,
}
