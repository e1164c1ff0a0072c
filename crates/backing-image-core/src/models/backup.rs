//! Backing image backup request

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Compression used when the caller does not pick one
pub const DEFAULT_COMPRESSION_METHOD: &str = "lz4";

/// Backend parallelism used when the caller does not pick one
pub const DEFAULT_BACKUP_CONCURRENT_LIMIT: i64 = 2;

/// Request to back up a backing image to a backup target.
///
/// Built with [`BackupRequest::new`] and the `with_*` helpers:
///
/// ```
/// use backing_image_core::BackupRequest;
///
/// let request = BackupRequest::new(
///     "backup-1",
///     "bi-ubuntu",
///     "8d5c1f9e",
///     "lvs-0",
///     "sha512:abcd",
///     "s3://backups@us-east-1/",
/// )
/// .with_label("tier", "gold")
/// .with_concurrent_limit(4);
///
/// assert_eq!(request.labels["tier"], "gold");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRequest {
    pub backup_name: String,
    /// Backing image name
    pub name: String,
    /// Backing image UUID
    pub uuid: String,
    /// Logical volume store holding the image
    pub lvs_uuid: String,
    pub checksum: String,
    /// Backup target URI
    pub backup_target: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Opaque secrets for the backup target
    #[serde(default)]
    pub credential: HashMap<String, String>,
    pub compression_method: String,
    /// Backend parallelism; must fit a 32-bit signed integer
    pub concurrent_limit: i64,
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

impl BackupRequest {
    pub fn new(
        backup_name: impl Into<String>,
        name: impl Into<String>,
        uuid: impl Into<String>,
        lvs_uuid: impl Into<String>,
        checksum: impl Into<String>,
        backup_target: impl Into<String>,
    ) -> Self {
        Self {
            backup_name: backup_name.into(),
            name: name.into(),
            uuid: uuid.into(),
            lvs_uuid: lvs_uuid.into(),
            checksum: checksum.into(),
            backup_target: backup_target.into(),
            labels: HashMap::new(),
            credential: HashMap::new(),
            compression_method: DEFAULT_COMPRESSION_METHOD.to_string(),
            concurrent_limit: DEFAULT_BACKUP_CONCURRENT_LIMIT,
            parameters: HashMap::new(),
        }
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn with_credential(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.credential.insert(key.into(), value.into());
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_compression_method(mut self, method: impl Into<String>) -> Self {
        self.compression_method = method.into();
        self
    }

    pub fn with_concurrent_limit(mut self, limit: i64) -> Self {
        self.concurrent_limit = limit;
        self
    }
}
