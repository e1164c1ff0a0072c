//! Translation between domain arguments/entities and wire messages

use std::collections::HashMap;

use backing_image_core::{
    BackingImage, BackingImageChangeEvent, BackingImageCollection, BackingImageResponse,
    BackingImageState, BackupCreateRequest, BackupRequest, CreateRequest, ListResponse, Operation,
    WireResponse,
};

use crate::error::{ProxyError, Result};

// =============================================================================
// Outbound
// =============================================================================

/// Arguments for a backing image creation
#[derive(Debug, Clone, Copy)]
pub(crate) struct CreateArgs<'a> {
    pub name: &'a str,
    pub backing_image_uuid: &'a str,
    pub disk_uuid: &'a str,
    pub checksum: &'a str,
    pub from_address: &'a str,
    pub src_lvs_uuid: &'a str,
    pub size: u64,
}

pub(crate) fn create_request(args: CreateArgs<'_>) -> CreateRequest {
    CreateRequest {
        name: args.name.to_string(),
        backing_image_uuid: args.backing_image_uuid.to_string(),
        disk_uuid: args.disk_uuid.to_string(),
        size: args.size,
        checksum: args.checksum.to_string(),
        from_address: args.from_address.to_string(),
        src_lvs_uuid: args.src_lvs_uuid.to_string(),
    }
}

/// Flatten labels into `key=value` entries, sorted by key
pub fn labels_to_wire(labels: &HashMap<String, String>) -> Vec<String> {
    let mut entries: Vec<(&String, &String)> = labels.iter().collect();
    entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
    entries
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect()
}

pub(crate) fn backup_create_request(request: &BackupRequest) -> Result<BackupCreateRequest> {
    let concurrent_limit =
        i32::try_from(request.concurrent_limit).map_err(|_| ProxyError::Range {
            field: "concurrentLimit",
            value: request.concurrent_limit,
        })?;

    Ok(BackupCreateRequest {
        backup_name: request.backup_name.clone(),
        name: request.name.clone(),
        uuid: request.uuid.clone(),
        lvs_uuid: request.lvs_uuid.clone(),
        checksum: request.checksum.clone(),
        backup_target: request.backup_target.clone(),
        labels: labels_to_wire(&request.labels),
        credential: request.credential.clone(),
        compression_method: request.compression_method.clone(),
        concurrent_limit,
        parameters: request.parameters.clone(),
    })
}

// =============================================================================
// Inbound
// =============================================================================

/// Convert a wire backing image into the domain entity
pub(crate) fn backing_image_from_wire(resp: BackingImageResponse) -> Result<BackingImage> {
    let mut missing = Vec::new();
    if resp.name.is_empty() {
        missing.push("name");
    }
    if resp.backing_image_uuid.is_empty() {
        missing.push("backing_image_uuid");
    }
    if resp.disk_uuid.is_empty() {
        missing.push("disk_uuid");
    }
    if !missing.is_empty() {
        return Err(ProxyError::Decode(format!(
            "backing image response missing {}",
            missing.join(", ")
        )));
    }

    Ok(BackingImage {
        state: BackingImageState::from_wire(&resp.state),
        name: resp.name,
        backing_image_uuid: resp.backing_image_uuid,
        disk_uuid: resp.disk_uuid,
        size: resp.size,
        checksum: resp.checksum,
        from_address: resp.from_address,
        src_lvs_uuid: resp.src_lvs_uuid,
        lvs_name: resp.lvs_name,
        lvs_uuid: resp.lvs_uuid,
        progress: resp.progress,
        current_checksum: resp.current_checksum,
        error_msg: resp.error_msg,
    })
}

pub(crate) fn collection_from_wire(resp: ListResponse) -> Result<BackingImageCollection> {
    let mut collection = BackingImageCollection::new();
    for (key, entry) in resp.backing_images {
        let image = backing_image_from_wire(entry)?;
        if image.name != key {
            return Err(ProxyError::Decode(format!(
                "list entry '{}' holds backing image '{}'",
                key, image.name
            )));
        }
        collection.insert(image);
    }
    Ok(collection)
}

pub(crate) fn event_from_wire(
    resp: BackingImageResponse,
    sequence: u64,
) -> Result<BackingImageChangeEvent> {
    Ok(BackingImageChangeEvent {
        sequence,
        backing_image: backing_image_from_wire(resp)?,
    })
}

// =============================================================================
// Response envelopes
// =============================================================================

fn unexpected(operation: Operation, resp: &WireResponse) -> ProxyError {
    ProxyError::Decode(format!(
        "{} returned an unexpected {} response",
        operation,
        resp.variant_name()
    ))
}

pub(crate) fn expect_backing_image(
    operation: Operation,
    resp: WireResponse,
) -> Result<BackingImageResponse> {
    match resp {
        WireResponse::BackingImage(image) => Ok(image),
        other => Err(unexpected(operation, &other)),
    }
}

pub(crate) fn expect_list(operation: Operation, resp: WireResponse) -> Result<ListResponse> {
    match resp {
        WireResponse::List(list) => Ok(list),
        other => Err(unexpected(operation, &other)),
    }
}

pub(crate) fn expect_empty(operation: Operation, resp: WireResponse) -> Result<()> {
    match resp {
        WireResponse::Empty => Ok(()),
        other => Err(unexpected(operation, &other)),
    }
}
