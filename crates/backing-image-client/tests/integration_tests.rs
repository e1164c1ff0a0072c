//! Integration tests for backing-image-client
//!
//! These drive the public client against the in-memory channel from the
//! `testing` module, covering validation, translation, deadlines and the
//! watch protocol end to end.

use std::collections::HashMap;
use std::time::Duration;

use backing_image_client::testing::{echo, TestHarness, WatchItem};
use backing_image_client::{
    BackingImageState, BackupRequest, ChannelError, ErrorKind, Operation, ProxyError,
};
use backing_image_core::{
    BackingImageResponse, CreateRequest, ListResponse, WireRequest, WireResponse,
};
use pretty_assertions::assert_eq;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

// =============================================================================
// Helpers
// =============================================================================

/// Route client logs to the test writer; set RUST_LOG to see them
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn wire_image(name: &str, state: &str, progress: i32) -> BackingImageResponse {
    BackingImageResponse {
        name: name.to_string(),
        backing_image_uuid: format!("{}-uuid", name),
        disk_uuid: "disk-1".to_string(),
        size: 64 << 20,
        checksum: "sha512:0badc0de".to_string(),
        lvs_name: "lvs-disk-1".to_string(),
        progress,
        state: state.to_string(),
        ..Default::default()
    }
}

fn backup_request() -> BackupRequest {
    BackupRequest::new(
        "backup-7",
        "bi-ubuntu",
        uuid::Uuid::new_v4().to_string(),
        "lvs-0",
        "sha512:0badc0de",
        "s3://backupbucket@us-east-1/",
    )
}

// =============================================================================
// Validation
// =============================================================================

fn validation_fields(err: ProxyError) -> Vec<String> {
    match err {
        ProxyError::Validation { source, .. } => source.fields,
        other => panic!("expected validation error, got: {other}"),
    }
}

#[tokio::test]
async fn test_create_validation_lists_every_empty_field() {
    let harness = TestHarness::new();

    let err = harness
        .client
        .backing_image_create("", "uuid", "", "", "10.0.0.5:8000", "", 4096)
        .await
        .unwrap_err();

    assert_eq!(validation_fields(err), vec!["name", "diskUUID", "checksum"]);
    assert_eq!(harness.channel.total_calls(), 0);
}

#[tokio::test]
async fn test_get_and_delete_validation_skip_network() {
    let harness = TestHarness::new();

    let err = harness
        .client
        .backing_image_get("bi-a", "")
        .await
        .unwrap_err();
    assert_eq!(validation_fields(err), vec!["diskUUID"]);

    let err = harness
        .client
        .backing_image_delete("", "disk-1")
        .await
        .unwrap_err();
    assert_eq!(validation_fields(err), vec!["name"]);

    assert_eq!(harness.channel.total_calls(), 0);
}

#[tokio::test]
async fn test_backup_validation_lists_every_empty_field() {
    let harness = TestHarness::new();
    let request = BackupRequest::new("", "bi-a", "", "lvs-0", "", "");

    let err = harness
        .client
        .backing_image_backup_create(&request)
        .await
        .unwrap_err();

    assert_eq!(
        validation_fields(err),
        vec!["backup_name", "uuid", "checksum", "backup_target"]
    );
    assert_eq!(harness.channel.total_calls(), 0);
}

#[tokio::test]
async fn test_create_zero_size_is_invalid_argument() {
    let harness = TestHarness::new();

    let err = harness
        .client
        .backing_image_create("bi-a", "uuid", "disk-1", "sum", "", "", 0)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(err.is_local());
    assert_eq!(harness.channel.total_calls(), 0);
}

#[tokio::test]
async fn test_backup_concurrent_limit_out_of_range() {
    let harness = TestHarness::new();
    let request = backup_request().with_concurrent_limit(i64::from(i32::MAX) + 1);

    let err = harness
        .client
        .backing_image_backup_create(&request)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Range);
    assert_eq!(harness.channel.total_calls(), 0);
}

// =============================================================================
// Unary Operations
// =============================================================================

#[tokio::test]
async fn test_create_round_trip() {
    let harness = TestHarness::new();

    let image = harness
        .client
        .backing_image_create(
            "bi-ubuntu",
            "6f0c2f5e-uuid",
            "disk-1",
            "sha512:0badc0de",
            "10.0.0.5:8000",
            "lvs-src",
            512 << 20,
        )
        .await
        .unwrap();

    let requests = harness.channel.requests();
    let sent = match &requests[..] {
        [WireRequest::Create(req)] => req.clone(),
        other => panic!("unexpected requests: {other:?}"),
    };

    assert_eq!(image.name, sent.name);
    assert_eq!(image.backing_image_uuid, sent.backing_image_uuid);
    assert_eq!(image.disk_uuid, sent.disk_uuid);
    assert_eq!(image.size, sent.size);
    assert_eq!(image.checksum, sent.checksum);
    assert_eq!(image.from_address, sent.from_address);
    assert_eq!(image.src_lvs_uuid, sent.src_lvs_uuid);
    assert_eq!(image.state, BackingImageState::Pending);
}

#[tokio::test]
async fn test_create_with_unexpected_ack_is_decode_error() {
    let harness = TestHarness::new();
    harness
        .channel
        .push_response(Operation::BackingImageCreate, Ok(WireResponse::Empty));

    let err = harness
        .client
        .backing_image_create("bi-a", "uuid", "disk-1", "sum", "", "", 1)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn test_get_returns_backing_image() {
    let harness = TestHarness::new();
    harness.channel.push_response(
        Operation::BackingImageGet,
        Ok(WireResponse::BackingImage(wire_image("bi-a", "in-progress", 40))),
    );

    let image = harness
        .client
        .backing_image_get("bi-a", "disk-1")
        .await
        .unwrap();

    assert_eq!(image.name, "bi-a");
    assert_eq!(image.state, BackingImageState::InProgress);
    assert_eq!(image.progress, 40);
    assert_eq!(image.lvs_name, "lvs-disk-1");
}

#[tokio::test]
async fn test_get_not_found_carries_context() {
    let harness = TestHarness::new();

    let err = harness
        .client
        .backing_image_get("bi-gone", "disk-9")
        .await
        .unwrap_err();

    match err {
        ProxyError::NotFound {
            operation, target, ..
        } => {
            assert_eq!(operation, Operation::BackingImageGet);
            assert_eq!(target, "name=bi-gone diskUUID=disk-9");
        }
        other => panic!("expected not found, got: {other}"),
    }
}

#[tokio::test]
async fn test_delete_sends_identifiers() {
    let harness = TestHarness::new();

    assert_ok!(harness.client.backing_image_delete("bi-a", "disk-1").await);

    match &harness.channel.requests()[..] {
        [WireRequest::Delete(req)] => {
            assert_eq!(req.name, "bi-a");
            assert_eq!(req.disk_uuid, "disk-1");
        }
        other => panic!("unexpected requests: {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_backend_error_passthrough() {
    let harness = TestHarness::new();
    harness.channel.push_response(
        Operation::BackingImageDelete,
        Err(ChannelError::status(9, "backing image is in use")),
    );

    let err = assert_err!(harness.client.backing_image_delete("bi-a", "disk-1").await);

    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(err.to_string().contains("backing image is in use"));
}

#[tokio::test]
async fn test_list_empty_backend() {
    let harness = TestHarness::new();

    let images = harness.client.backing_image_list().await.unwrap();

    assert!(images.is_empty());
    assert_eq!(harness.channel.calls(Operation::BackingImageList), 1);
}

#[tokio::test]
async fn test_list_populated() {
    let harness = TestHarness::new();
    let mut list = ListResponse::default();
    for (name, state) in [("bi-a", "ready"), ("bi-b", "failed")] {
        list.backing_images
            .insert(name.to_string(), wire_image(name, state, 100));
    }
    harness
        .channel
        .push_response(Operation::BackingImageList, Ok(WireResponse::List(list)));

    let images = harness.client.backing_image_list().await.unwrap();

    assert_eq!(images.names(), vec!["bi-a", "bi-b"]);
    assert!(images.get("bi-a").unwrap().is_ready());
    assert!(images.get("bi-b").unwrap().is_failed());
}

#[tokio::test]
async fn test_list_backend_failure_is_list_error() {
    let harness = TestHarness::new();
    harness.channel.push_response(
        Operation::BackingImageList,
        Err(ChannelError::Unavailable("connection refused".into())),
    );

    let err = harness.client.backing_image_list().await.unwrap_err();

    match err {
        ProxyError::List(cause) => assert_eq!(cause.kind(), ErrorKind::Backend),
        other => panic!("expected list error, got: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_list_timeout_root_kind() {
    let harness = TestHarness::with_timeout(Duration::from_millis(200));
    harness.channel.set_latency(Duration::from_secs(1));

    let err = harness.client.backing_image_list().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::List);
    assert_eq!(err.root_kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn test_backup_create_translates_request() {
    let harness = TestHarness::new();
    let request = backup_request()
        .with_label("b", "2")
        .with_label("a", "1")
        .with_credential("AWS_ACCESS_KEY_ID", "AKIA")
        .with_parameter("mode", "full")
        .with_compression_method("gzip")
        .with_concurrent_limit(3);

    harness
        .client
        .backing_image_backup_create(&request)
        .await
        .unwrap();
    harness
        .client
        .backing_image_backup_create(&request)
        .await
        .unwrap();

    let requests = harness.channel.requests();
    assert_eq!(requests.len(), 2);
    for sent in requests {
        match sent {
            WireRequest::BackupCreate(wire) => {
                assert_eq!(wire.labels, vec!["a=1", "b=2"]);
                assert_eq!(wire.backup_name, "backup-7");
                assert_eq!(wire.uuid, request.uuid);
                assert_eq!(wire.credential, request.credential);
                assert_eq!(
                    wire.parameters,
                    HashMap::from([("mode".to_string(), "full".to_string())])
                );
                assert_eq!(wire.compression_method, "gzip");
                assert_eq!(wire.concurrent_limit, 3);
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }
}

// =============================================================================
// Deadlines and Concurrency
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_unary_timeout() {
    init_tracing();
    let harness = TestHarness::with_timeout(Duration::from_millis(500));
    harness.channel.set_latency(Duration::from_secs(5));

    let err = harness
        .client
        .backing_image_get("bi-a", "disk-1")
        .await
        .unwrap_err();

    match err {
        ProxyError::Timeout {
            operation, timeout, ..
        } => {
            assert_eq!(operation, Operation::BackingImageGet);
            assert_eq!(timeout, Duration::from_millis(500));
        }
        other => panic!("expected timeout, got: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_channel_deadline_exceeded_is_timeout() {
    let harness = TestHarness::with_timeout(Duration::from_secs(1));
    harness
        .channel
        .push_response(Operation::BackingImageDelete, Err(ChannelError::DeadlineExceeded));

    let err = harness
        .client
        .backing_image_delete("bi-a", "disk-1")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_calls_do_not_serialize() {
    let harness = TestHarness::with_timeout(Duration::from_secs(3));
    harness.channel.set_latency(Duration::from_secs(2));

    let start = tokio::time::Instant::now();
    let client = harness.client.clone();
    let (a, b, c) = tokio::join!(
        harness.client.backing_image_list(),
        client.backing_image_delete("bi-a", "disk-1"),
        client.backing_image_create("bi-b", "uuid", "disk-1", "sum", "", "", 1),
    );

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert!(c.is_ok());
    assert!(start.elapsed() < Duration::from_secs(3));
    assert_eq!(harness.channel.total_calls(), 3);
}

// =============================================================================
// Watch
// =============================================================================

#[tokio::test]
async fn test_watch_with_cancelled_token_is_empty() {
    let harness = TestHarness::new();
    harness
        .channel
        .set_watch_script(vec![WatchItem::Event(wire_image("bi-a", "ready", 100))]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut stream = harness.client.backing_image_watch(cancel).await.unwrap();

    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_watch_delivers_events_in_order_then_ends() {
    init_tracing();
    let harness = TestHarness::new();
    harness.channel.set_watch_script(vec![
        WatchItem::Event(wire_image("bi-a", "pending", 0)),
        WatchItem::Event(wire_image("bi-a", "in-progress", 50)),
        WatchItem::Event(wire_image("bi-a", "ready", 100)),
    ]);

    let mut stream = harness
        .client
        .backing_image_watch(CancellationToken::new())
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let Some(event) = stream.next().await {
        let event = event.unwrap();
        seen.push((
            event.sequence,
            event.backing_image.state,
            event.backing_image.progress,
        ));
    }

    assert_eq!(
        seen,
        vec![
            (1, BackingImageState::Pending, 0),
            (2, BackingImageState::InProgress, 50),
            (3, BackingImageState::Ready, 100),
        ]
    );
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_watch_error_ends_stream() {
    init_tracing();
    let harness = TestHarness::new();
    harness.channel.set_watch_script(vec![
        WatchItem::Event(wire_image("bi-a", "starting", 0)),
        WatchItem::Error(ChannelError::ConnectionClosed),
        WatchItem::Event(wire_image("bi-a", "ready", 100)),
    ]);

    let mut stream = harness
        .client
        .backing_image_watch(CancellationToken::new())
        .await
        .unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.backing_image.state, BackingImageState::Starting);

    let err = stream.next().await.unwrap().unwrap_err();
    match err {
        ProxyError::Stream(cause) => assert_eq!(cause, ChannelError::ConnectionClosed),
        other => panic!("expected stream error, got: {other}"),
    }

    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_watch_malformed_event_ends_stream() {
    let harness = TestHarness::new();
    let mut broken = wire_image("bi-a", "ready", 100);
    broken.disk_uuid.clear();
    harness.channel.set_watch_script(vec![
        WatchItem::Event(broken),
        WatchItem::Event(wire_image("bi-b", "ready", 100)),
    ]);

    let mut stream = harness
        .client
        .backing_image_watch(CancellationToken::new())
        .await
        .unwrap();

    let err = stream.next().await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_watch_cancel_unblocks_pending_pull() {
    init_tracing();
    let harness = TestHarness::new();
    harness
        .channel
        .set_watch_script(vec![WatchItem::Event(wire_image("bi-a", "ready", 100))]);
    harness.channel.hold_watch_open(true);
    let cancel = CancellationToken::new();

    let mut stream = harness
        .client
        .backing_image_watch(cancel.clone())
        .await
        .unwrap();
    assert!(stream.next().await.unwrap().is_ok());

    let puller = tokio::spawn(async move { stream.next().await.is_none() });
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let ended = tokio::time::timeout(Duration::from_secs(1), puller)
        .await
        .expect("pull was not unblocked by cancellation")
        .unwrap();
    assert!(ended);
}

#[tokio::test]
async fn test_watch_handle_cancel() {
    let harness = TestHarness::new();
    harness.channel.hold_watch_open(true);
    let cancel = CancellationToken::new();

    let mut stream = harness
        .client
        .backing_image_watch(cancel.clone())
        .await
        .unwrap();
    stream.cancel();

    assert!(stream.is_cancelled());
    assert!(stream.next().await.is_none());
    // Stopping one subscription leaves the caller's token alone
    assert!(!cancel.is_cancelled());
}

#[tokio::test]
async fn test_watch_open_failure() {
    let harness = TestHarness::new();
    harness
        .channel
        .fail_subscribe(ChannelError::Unavailable("no route to host".into()));

    let err = harness
        .client
        .backing_image_watch(CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ProxyError::Backend { operation, .. } => {
            assert_eq!(operation, Operation::BackingImageWatch)
        }
        other => panic!("expected backend error, got: {other}"),
    }
}

#[tokio::test]
async fn test_watch_open_failure_kinds() {
    let harness = TestHarness::new();

    harness
        .channel
        .fail_subscribe(ChannelError::NotFound("watch endpoint".into()));
    let err = harness
        .client
        .backing_image_watch(CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    harness.channel.fail_subscribe(ChannelError::DeadlineExceeded);
    let err = harness
        .client
        .backing_image_watch(CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
}

#[tokio::test]
async fn test_watch_cancel_while_opening() {
    init_tracing();
    let harness = TestHarness::new();
    harness.channel.stall_subscribe(true);
    let cancel = CancellationToken::new();

    let client = harness.client.clone();
    let token = cancel.clone();
    let opening = tokio::spawn(async move { client.backing_image_watch(token).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let mut stream = tokio::time::timeout(Duration::from_secs(1), opening)
        .await
        .expect("watch open was not unblocked by cancellation")
        .unwrap()
        .unwrap();
    assert!(stream.next().await.is_none());
    assert_eq!(harness.channel.calls(Operation::BackingImageWatch), 1);
}

#[tokio::test]
async fn test_watch_drop_cancels_subscription() {
    let harness = TestHarness::new();
    harness.channel.hold_watch_open(true);
    let cancel = CancellationToken::new();

    let stream = harness
        .client
        .backing_image_watch(cancel.clone())
        .await
        .unwrap();
    let tokens = harness.channel.watch_tokens();
    assert_eq!(tokens.len(), 1);
    assert!(!tokens[0].is_cancelled());

    drop(stream);

    assert!(tokens[0].is_cancelled());
    assert!(!cancel.is_cancelled());
}

#[tokio::test]
async fn test_watch_does_not_block_unary_calls() {
    let harness = TestHarness::new();
    harness.channel.hold_watch_open(true);

    let mut stream = harness
        .client
        .backing_image_watch(CancellationToken::new())
        .await
        .unwrap();
    let pending = tokio::spawn(async move { stream.next().await.is_none() });

    let images = harness.client.backing_image_list().await.unwrap();
    assert!(images.is_empty());

    pending.abort();
}

// =============================================================================
// Fake Channel Echo
// =============================================================================

#[test]
fn test_echo_matches_request() {
    let req = CreateRequest {
        name: "bi-a".into(),
        backing_image_uuid: "uuid".into(),
        disk_uuid: "disk-1".into(),
        size: 1,
        checksum: "sum".into(),
        from_address: String::new(),
        src_lvs_uuid: String::new(),
    };
    let resp = echo(&req);
    assert_eq!(resp.name, req.name);
    assert_eq!(resp.state, "pending");
}
