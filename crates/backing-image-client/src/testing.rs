//! Test utilities for backing-image-client
//!
//! Provides a scriptable in-memory [`ProxyChannel`] and a harness pairing
//! it with a client, for unit and integration tests that must not touch a
//! real data plane.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backing_image_core::{
    BackingImageResponse, ChannelError, CreateRequest, ListResponse, Operation, ProxyChannel,
    WatchRequest, WireEventStream, WireRequest, WireResponse,
};
use futures::stream::{self, StreamExt};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use crate::config::ProxyConfig;
use crate::ProxyClient;

/// One scripted item of a watch subscription
#[derive(Debug, Clone)]
pub enum WatchItem {
    Event(BackingImageResponse),
    Error(ChannelError),
}

/// In-memory channel for testing
///
/// Unscripted calls get a plausible default answer:
/// - create echoes the request back as a `pending` backing image
/// - delete and backup create acknowledge
/// - get reports not found
/// - list returns an empty listing
///
/// Watch subscriptions replay the configured script, then either end or
/// (with [`FakeChannel::hold_watch_open`]) stay open until cancelled.
pub struct FakeChannel {
    latency: RwLock<Duration>,
    calls: RwLock<HashMap<Operation, usize>>,
    requests: RwLock<Vec<WireRequest>>,
    /// Scripted unary answers, consumed in order per operation
    responses: RwLock<HashMap<Operation, VecDeque<Result<WireResponse, ChannelError>>>>,
    watch_script: RwLock<Vec<WatchItem>>,
    watch_hold_open: RwLock<bool>,
    subscribe_error: RwLock<Option<ChannelError>>,
    subscribe_stalled: RwLock<bool>,
    /// Tokens handed to `subscribe`, oldest first
    watch_tokens: RwLock<Vec<CancellationToken>>,
}

impl Default for FakeChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeChannel {
    pub fn new() -> Self {
        Self {
            latency: RwLock::new(Duration::ZERO),
            calls: RwLock::new(HashMap::new()),
            requests: RwLock::new(Vec::new()),
            responses: RwLock::new(HashMap::new()),
            watch_script: RwLock::new(Vec::new()),
            watch_hold_open: RwLock::new(false),
            subscribe_error: RwLock::new(None),
            subscribe_stalled: RwLock::new(false),
            watch_tokens: RwLock::new(Vec::new()),
        }
    }

    /// Delay every unary answer by `latency`
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.write() = latency;
    }

    /// Queue an answer for the next unscripted call to `operation`
    pub fn push_response(
        &self,
        operation: Operation,
        response: Result<WireResponse, ChannelError>,
    ) {
        self.responses
            .write()
            .entry(operation)
            .or_default()
            .push_back(response);
    }

    /// Script the items every subsequent watch subscription replays
    pub fn set_watch_script(&self, items: Vec<WatchItem>) {
        *self.watch_script.write() = items;
    }

    /// Keep watch subscriptions open after the script is exhausted
    pub fn hold_watch_open(&self, hold: bool) {
        *self.watch_hold_open.write() = hold;
    }

    /// Make the next watch subscription fail to open
    pub fn fail_subscribe(&self, error: ChannelError) {
        *self.subscribe_error.write() = Some(error);
    }

    /// Make watch subscriptions never finish opening, like a connect that
    /// hangs
    pub fn stall_subscribe(&self, stall: bool) {
        *self.subscribe_stalled.write() = stall;
    }

    /// Cancellation tokens watch subscriptions were opened with
    pub fn watch_tokens(&self) -> Vec<CancellationToken> {
        self.watch_tokens.read().clone()
    }

    /// Number of calls made to `operation`, including watch subscriptions
    pub fn calls(&self, operation: Operation) -> usize {
        self.calls.read().get(&operation).copied().unwrap_or(0)
    }

    /// Number of calls made to any operation
    pub fn total_calls(&self) -> usize {
        self.calls.read().values().sum()
    }

    /// Unary requests received so far, oldest first
    pub fn requests(&self) -> Vec<WireRequest> {
        self.requests.read().clone()
    }

    fn record(&self, operation: Operation) {
        *self.calls.write().entry(operation).or_insert(0) += 1;
    }

    fn default_response(request: &WireRequest) -> Result<WireResponse, ChannelError> {
        match request {
            WireRequest::Create(req) => Ok(WireResponse::BackingImage(echo(req))),
            WireRequest::Delete(_) | WireRequest::BackupCreate(_) => Ok(WireResponse::Empty),
            WireRequest::Get(req) => Err(ChannelError::NotFound(format!(
                "backing image {} on disk {}",
                req.name, req.disk_uuid
            ))),
            WireRequest::List => Ok(WireResponse::List(ListResponse::default())),
        }
    }
}

/// The backing image a service would report right after accepting `req`
pub fn echo(req: &CreateRequest) -> BackingImageResponse {
    BackingImageResponse {
        name: req.name.clone(),
        backing_image_uuid: req.backing_image_uuid.clone(),
        disk_uuid: req.disk_uuid.clone(),
        size: req.size,
        checksum: req.checksum.clone(),
        from_address: req.from_address.clone(),
        src_lvs_uuid: req.src_lvs_uuid.clone(),
        state: "pending".to_string(),
        ..Default::default()
    }
}

#[async_trait]
impl ProxyChannel for FakeChannel {
    async fn invoke(
        &self,
        request: WireRequest,
        _deadline: Duration,
    ) -> Result<WireResponse, ChannelError> {
        let operation = request.operation();
        self.record(operation);
        self.requests.write().push(request.clone());

        let latency = *self.latency.read();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let scripted = self
            .responses
            .write()
            .get_mut(&operation)
            .and_then(|queue| queue.pop_front());

        tracing::debug!(%operation, scripted = scripted.is_some(), "Fake channel: invoked");
        scripted.unwrap_or_else(|| Self::default_response(&request))
    }

    async fn subscribe(
        &self,
        _request: WatchRequest,
        cancel: CancellationToken,
    ) -> Result<WireEventStream, ChannelError> {
        self.record(Operation::BackingImageWatch);
        self.watch_tokens.write().push(cancel.clone());

        let stalled = *self.subscribe_stalled.read();
        if stalled {
            futures::future::pending::<()>().await;
        }

        if let Some(err) = self.subscribe_error.write().take() {
            return Err(err);
        }

        let items: Vec<Result<BackingImageResponse, ChannelError>> = self
            .watch_script
            .read()
            .iter()
            .cloned()
            .map(|item| match item {
                WatchItem::Event(resp) => Ok(resp),
                WatchItem::Error(err) => Err(err),
            })
            .collect();

        let script = stream::iter(items);
        if *self.watch_hold_open.read() {
            // Stay open until the subscriber cancels, like a quiet server
            let tail = stream::once(async move {
                cancel.cancelled().await;
            })
            .filter_map(|()| async {
                None::<Result<BackingImageResponse, ChannelError>>
            });
            Ok(script.chain(tail).boxed())
        } else {
            Ok(script.boxed())
        }
    }
}

/// A client wired to a [`FakeChannel`]
pub struct TestHarness {
    pub client: ProxyClient,
    pub channel: Arc<FakeChannel>,
}

impl TestHarness {
    /// Create a harness with the default configuration
    pub fn new() -> Self {
        Self::with_config(&ProxyConfig::default())
    }

    /// Create a harness whose client uses `timeout` for unary calls
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_config(&ProxyConfig::builder().service_timeout(timeout).build())
    }

    pub fn with_config(config: &ProxyConfig) -> Self {
        let channel = Arc::new(FakeChannel::new());
        let client = ProxyClient::with_config(channel.clone(), config);
        Self { client, channel }
    }

    /// Get a reference to the client
    pub fn client(&self) -> &ProxyClient {
        &self.client
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
