//! Backing image proxy client implementation

use std::sync::Arc;
use std::time::Duration;

use backing_image_core::{
    BackingImage, BackingImageCollection, BackupRequest, DeleteRequest, GetRequest, Operation,
    ProxyChannel, WatchRequest, WireRequest,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result};
use crate::executor::UnaryExecutor;
use crate::streaming::BackingImageStream;
use crate::translate::{self, CreateArgs};
use crate::validate::{describe, validate_parameters};

/// Error context for operations that span every backing image
const ALL_BACKING_IMAGES: &str = "all backing images";

/// Backing image lifecycle proxy
///
/// Validates identifiers locally, then forwards each operation to the
/// data plane through a shared [`ProxyChannel`]. Holds no state besides
/// the channel handle and its configuration, so clones are cheap and
/// concurrent calls never wait on each other.
#[derive(Clone)]
pub struct ProxyClient {
    executor: UnaryExecutor,
}

impl ProxyClient {
    /// Create a new proxy client with the default configuration
    pub fn new(channel: Arc<dyn ProxyChannel>) -> Self {
        Self::with_config(channel, &ProxyConfig::default())
    }

    /// Create a new proxy client with custom configuration
    pub fn with_config(channel: Arc<dyn ProxyChannel>, config: &ProxyConfig) -> Self {
        Self {
            executor: UnaryExecutor::new(channel, config.service_timeout()),
        }
    }

    /// Deadline applied to every unary operation
    pub fn service_timeout(&self) -> Duration {
        self.executor.timeout()
    }

    // =========================================================================
    // Backing Image Operations
    // =========================================================================

    /// Create a backing image on a disk
    ///
    /// # Arguments
    /// * `name`, `backing_image_uuid`, `disk_uuid`, `checksum` - Required
    /// * `from_address` - Address to pull content from; may be empty
    /// * `src_lvs_uuid` - Source logical volume store when cloning; may be empty
    /// * `size` - Full expected payload size in bytes; must not be zero
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip(self))]
    pub async fn backing_image_create(
        &self,
        name: &str,
        backing_image_uuid: &str,
        disk_uuid: &str,
        checksum: &str,
        from_address: &str,
        src_lvs_uuid: &str,
        size: u64,
    ) -> Result<BackingImage> {
        if size == 0 {
            return Err(ProxyError::InvalidArgument(
                "failed to create backing image, size should not be zero".to_string(),
            ));
        }

        let params = [
            ("name", name),
            ("backingImageUUID", backing_image_uuid),
            ("diskUUID", disk_uuid),
            ("checksum", checksum),
        ];
        validate_parameters(&params).map_err(|source| ProxyError::Validation {
            action: "create backing image",
            source,
        })?;

        let request = translate::create_request(CreateArgs {
            name,
            backing_image_uuid,
            disk_uuid,
            checksum,
            from_address,
            src_lvs_uuid,
            size,
        });

        let target = describe(&[("name", name), ("diskUUID", disk_uuid)]);
        let response = self
            .executor
            .call(WireRequest::Create(request), &target)
            .await?;

        let resp = translate::expect_backing_image(Operation::BackingImageCreate, response)?;
        translate::backing_image_from_wire(resp)
    }

    /// Delete a backing image from a disk
    ///
    /// Whether deleting an absent image succeeds is up to the service.
    #[instrument(skip(self))]
    pub async fn backing_image_delete(&self, name: &str, disk_uuid: &str) -> Result<()> {
        let params = [("name", name), ("diskUUID", disk_uuid)];
        validate_parameters(&params).map_err(|source| ProxyError::Validation {
            action: "delete backing image",
            source,
        })?;

        let request = DeleteRequest {
            name: name.to_string(),
            disk_uuid: disk_uuid.to_string(),
        };

        let response = self
            .executor
            .call(WireRequest::Delete(request), &describe(&params))
            .await?;
        translate::expect_empty(Operation::BackingImageDelete, response)
    }

    /// Get a backing image on a disk
    #[instrument(skip(self))]
    pub async fn backing_image_get(&self, name: &str, disk_uuid: &str) -> Result<BackingImage> {
        let params = [("name", name), ("diskUUID", disk_uuid)];
        validate_parameters(&params).map_err(|source| ProxyError::Validation {
            action: "get backing image",
            source,
        })?;

        let request = GetRequest {
            name: name.to_string(),
            disk_uuid: disk_uuid.to_string(),
        };

        let response = self
            .executor
            .call(WireRequest::Get(request), &describe(&params))
            .await?;

        let resp = translate::expect_backing_image(Operation::BackingImageGet, response)?;
        translate::backing_image_from_wire(resp)
    }

    /// List all backing images known to the service
    #[instrument(skip(self))]
    pub async fn backing_image_list(&self) -> Result<BackingImageCollection> {
        let response = self
            .executor
            .call(WireRequest::List, ALL_BACKING_IMAGES)
            .await
            .map_err(|e| ProxyError::List(Box::new(e)))?;

        let list = translate::expect_list(Operation::BackingImageList, response)?;
        let collection = translate::collection_from_wire(list)?;
        debug!(count = collection.len(), "Listed backing images");
        Ok(collection)
    }

    /// Watch backing image changes
    ///
    /// The stream ends without error when `cancel` is cancelled or the
    /// service closes it, and yields a `Stream` error when the subscription
    /// fails. It is never restarted. A token that is already cancelled
    /// produces an empty stream without contacting the service; cancelling
    /// while the subscription is still opening produces one too.
    #[instrument(skip(self, cancel))]
    pub async fn backing_image_watch(
        &self,
        cancel: CancellationToken,
    ) -> Result<BackingImageStream> {
        if cancel.is_cancelled() {
            debug!("Watch requested with a cancelled token");
            return Ok(BackingImageStream::empty());
        }

        let token = cancel.child_token();
        let subscribe = self
            .executor
            .channel()
            .subscribe(WatchRequest::default(), token.clone());

        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Watch cancelled while opening");
                return Ok(BackingImageStream::empty());
            }
            opened = subscribe => opened,
        };

        let events = opened.map_err(|e| {
            ProxyError::from_channel(
                Operation::BackingImageWatch,
                ALL_BACKING_IMAGES,
                self.executor.timeout(),
                e,
            )
        })?;

        debug!("Opened backing image watch");
        Ok(BackingImageStream::new(events, token))
    }

    /// Back up a backing image to a backup target
    ///
    /// Returns once the service accepts the request; backup progress is
    /// reported elsewhere.
    #[instrument(skip(self, request), fields(backup_name = %request.backup_name, name = %request.name))]
    pub async fn backing_image_backup_create(&self, request: &BackupRequest) -> Result<()> {
        let params = [
            ("backup_name", request.backup_name.as_str()),
            ("name", request.name.as_str()),
            ("uuid", request.uuid.as_str()),
            ("lvsUUID", request.lvs_uuid.as_str()),
            ("checksum", request.checksum.as_str()),
            ("backup_target", request.backup_target.as_str()),
        ];
        validate_parameters(&params).map_err(|source| ProxyError::Validation {
            action: "create backing image backup",
            source,
        })?;

        let wire = translate::backup_create_request(request)?;

        let target = describe(&[
            ("backup_name", request.backup_name.as_str()),
            ("name", request.name.as_str()),
        ]);
        let response = self
            .executor
            .call(WireRequest::BackupCreate(wire), &target)
            .await?;
        translate::expect_empty(Operation::BackingImageBackupCreate, response)
    }
}

impl std::fmt::Debug for ProxyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyClient")
            .field("service_timeout", &self.executor.timeout())
            .finish_non_exhaustive()
    }
}
