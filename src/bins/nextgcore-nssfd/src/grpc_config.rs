//! Configuration Stream Watcher
//!
//! Push-based alternative to the poller. Keeps a gRPC connection to the
//! configuration service and a `NetworkSliceSubscribe` stream on top of it:
//!
//! ```text
//! NoClient --connect--> ConnectedNoStream --ready+subscribe--> Subscribed
//!    ^                        |                                    |
//!    +--- N not-ready ticks --+                 stream error ------+--> ConnectedNoStream
//! ```
//!
//! Connection attempts run on a fixed tick; there is no exponential backoff
//! on this path.

use std::time::Duration;

use async_trait::async_trait;
use ogs_sbi::PlmnId;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tonic::codec::Streaming;
use tonic::transport::Endpoint;

use crate::nf_config::{ApplyOutcome, ConfigSnssai, NssaiConfigApplier, PlmnSnssai};
use crate::proto::{ConfigServiceClient, NetworkSlice, NetworkSliceRequest, NetworkSliceResponse};

/// Cadence of connection/readiness checks. Failed connects also wait one
/// tick; unlike the poller there is no backoff, so an unreachable config
/// server is retried at this fixed rate indefinitely.
pub const WATCHER_TICK: Duration = Duration::from_secs(5);
/// Upper bound on a single readiness probe
pub const READY_PROBE_TIMEOUT: Duration = Duration::from_secs(2);
/// Consecutive not-ready observations before the connection is dropped
pub const NOT_READY_THRESHOLD: u32 = 3;
/// `configUpdated` value marking a snapshot as a real config change
pub const CONFIG_UPDATED: u32 = 1;
/// TCP/HTTP2 connect timeout
pub const GRPC_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to connect to config server: {0}")]
    Connect(String),

    #[error("failed to subscribe to network slices: {0}")]
    Subscribe(tonic::Status),

    #[error("network slice stream failed: {0}")]
    Stream(tonic::Status),

    #[error("malformed network slice snapshot: {0}")]
    MalformedSnapshot(String),
}

/// Opens connections to the configuration service
#[async_trait]
pub trait SliceConfigConnector: Send + Sync + 'static {
    type Connection: SliceConfigConnection;

    async fn connect(&self) -> Result<Self::Connection, WatchError>;
}

/// An open connection that can be probed and subscribed on
#[async_trait]
pub trait SliceConfigConnection: Send + 'static {
    type Stream: SliceConfigStream;

    async fn is_ready(&mut self) -> bool;

    async fn subscribe(&mut self, request: NetworkSliceRequest) -> Result<Self::Stream, WatchError>;
}

/// Stream of full-replacement slice configurations
#[async_trait]
pub trait SliceConfigStream: Send + 'static {
    /// `Ok(None)` when the server closed the stream
    async fn next_snapshot(&mut self) -> Result<Option<NetworkSliceResponse>, WatchError>;
}

/// tonic-backed connector
#[derive(Debug, Clone)]
pub struct GrpcSliceConfigConnector {
    uri: String,
}

impl GrpcSliceConfigConnector {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

#[async_trait]
impl SliceConfigConnector for GrpcSliceConfigConnector {
    type Connection = GrpcSliceConfigConnection;

    async fn connect(&self) -> Result<Self::Connection, WatchError> {
        let endpoint = Endpoint::from_shared(self.uri.clone())
            .map_err(|e| WatchError::Connect(format!("{}: {e}", self.uri)))?
            .connect_timeout(GRPC_CONNECT_TIMEOUT)
            .http2_keep_alive_interval(Duration::from_secs(20))
            .keep_alive_timeout(READY_PROBE_TIMEOUT)
            .keep_alive_while_idle(true);

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| WatchError::Connect(format!("{}: {e}", self.uri)))?;

        Ok(GrpcSliceConfigConnection {
            client: ConfigServiceClient::new(channel),
        })
    }
}

pub struct GrpcSliceConfigConnection {
    client: ConfigServiceClient,
}

#[async_trait]
impl SliceConfigConnection for GrpcSliceConfigConnection {
    type Stream = Streaming<NetworkSliceResponse>;

    async fn is_ready(&mut self) -> bool {
        matches!(
            tokio::time::timeout(READY_PROBE_TIMEOUT, self.client.ready()).await,
            Ok(Ok(()))
        )
    }

    async fn subscribe(&mut self, request: NetworkSliceRequest) -> Result<Self::Stream, WatchError> {
        self.client
            .network_slice_subscribe(request)
            .await
            .map(tonic::Response::into_inner)
            .map_err(WatchError::Subscribe)
    }
}

#[async_trait]
impl SliceConfigStream for Streaming<NetworkSliceResponse> {
    async fn next_snapshot(&mut self) -> Result<Option<NetworkSliceResponse>, WatchError> {
        self.message().await.map_err(WatchError::Stream)
    }
}

/// Normalize streamed slices into the poller's wire representation.
///
/// Slices without a site PLMN or an NSSAI are skipped. A non-numeric SST
/// fails the whole snapshot.
pub fn network_slices_to_plmn_snssai(
    slices: &[NetworkSlice],
) -> Result<Vec<PlmnSnssai>, WatchError> {
    let mut config = Vec::with_capacity(slices.len());

    for slice in slices {
        let plmn = slice.site.as_ref().and_then(|site| site.plmn.as_ref());
        let (Some(plmn), Some(nssai)) = (plmn, slice.nssai.as_ref()) else {
            log::debug!("[grpc] slice {:?} has no PLMN or NSSAI, skipped", slice.name);
            continue;
        };

        let sst = nssai.sst.trim().parse::<u8>().map_err(|e| {
            WatchError::MalformedSnapshot(format!("slice {:?} sst {:?}: {e}", slice.name, nssai.sst))
        })?;
        let sd = (!nssai.sd.is_empty()).then(|| nssai.sd.clone());

        config.push(PlmnSnssai {
            plmn_id: PlmnId::new(plmn.mcc.clone(), plmn.mnc.clone()),
            s_nssai_list: vec![ConfigSnssai { sst, sd }],
        });
    }

    Ok(config)
}

/// Connection state of the watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherPhase {
    NoClient,
    ConnectedNoStream,
    Subscribed,
}

type StreamOf<C> = <<C as SliceConfigConnector>::Connection as SliceConfigConnection>::Stream;

/// gRPC configuration stream watcher
pub struct SliceConfigWatcher<C: SliceConfigConnector = GrpcSliceConfigConnector> {
    connector: C,
    client_id: String,
    self_restart_counter: u32,
    tick: Duration,
    connection: Option<C::Connection>,
    stream: Option<StreamOf<C>>,
    not_ready_count: u32,
    peer_restart_counter: Option<u32>,
    applier: NssaiConfigApplier,
}

impl<C: SliceConfigConnector> SliceConfigWatcher<C> {
    /// The self restart counter is drawn at random once per process
    pub fn new(connector: C, client_id: impl Into<String>, applier: NssaiConfigApplier) -> Self {
        Self {
            connector,
            client_id: client_id.into(),
            self_restart_counter: rand::random(),
            tick: WATCHER_TICK,
            connection: None,
            stream: None,
            not_ready_count: 0,
            peer_restart_counter: None,
            applier,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_self_restart_counter(mut self, counter: u32) -> Self {
        self.self_restart_counter = counter;
        self
    }

    pub fn phase(&self) -> WatcherPhase {
        match (&self.connection, &self.stream) {
            (_, Some(_)) => WatcherPhase::Subscribed,
            (Some(_), None) => WatcherPhase::ConnectedNoStream,
            (None, None) => WatcherPhase::NoClient,
        }
    }

    pub fn peer_restart_counter(&self) -> Option<u32> {
        self.peer_restart_counter
    }

    /// One connection-management tick: connect, probe readiness, subscribe
    pub async fn step(&mut self) -> WatcherPhase {
        if self.connection.is_none() {
            match self.connector.connect().await {
                Ok(connection) => {
                    log::info!("[grpc] Connected to config server");
                    self.connection = Some(connection);
                    self.not_ready_count = 0;
                }
                Err(e) => {
                    log::error!("[grpc] {e}");
                    return self.phase();
                }
            }
        }

        let Some(connection) = self.connection.as_mut() else {
            return self.phase();
        };

        if !connection.is_ready().await {
            self.not_ready_count += 1;
            log::warn!(
                "[grpc] Config server connection not ready ({}/{NOT_READY_THRESHOLD})",
                self.not_ready_count
            );
            if self.not_ready_count >= NOT_READY_THRESHOLD {
                log::error!("[grpc] Config server connection lost, reconnecting");
                self.connection = None;
                self.not_ready_count = 0;
            }
            return self.phase();
        }
        self.not_ready_count = 0;

        let request = NetworkSliceRequest {
            restart_counter: self.self_restart_counter,
            client_id: self.client_id.clone(),
        };
        match connection.subscribe(request).await {
            Ok(stream) => {
                log::info!("[grpc] Subscribed to network slice updates");
                self.stream = Some(stream);
            }
            Err(e) => log::error!("[grpc] {e}"),
        }
        self.phase()
    }

    /// Apply one received snapshot according to the peer restart policy
    pub fn handle_snapshot(&mut self, response: NetworkSliceResponse) -> Option<ApplyOutcome> {
        let counter = response.restart_counter;
        if let Some(known) = self.peer_restart_counter {
            if known != counter {
                if response.network_slice.is_empty() {
                    log::error!(
                        "[grpc] Config server restarted ({known} -> {counter}) and sent no slices, keeping current config"
                    );
                    return None;
                }
                log::warn!("[grpc] Config server restarted ({known} -> {counter}), applying full config");
            }
        }
        self.peer_restart_counter = Some(counter);

        // empty without the update flag carries no delete intent
        if response.network_slice.is_empty() && response.config_updated != CONFIG_UPDATED {
            log::debug!("[grpc] Empty snapshot without config update, ignored");
            return None;
        }

        match network_slices_to_plmn_snssai(&response.network_slice) {
            Ok(config) => Some(self.applier.apply(config)),
            Err(e) => {
                log::error!("[grpc] {e}");
                None
            }
        }
    }

    fn on_stream_event(&mut self, received: Result<Option<NetworkSliceResponse>, WatchError>) {
        match received {
            Ok(Some(response)) => {
                self.handle_snapshot(response);
            }
            Ok(None) => {
                log::warn!("[grpc] Network slice stream closed by server");
                self.stream = None;
            }
            Err(e) => {
                log::error!("[grpc] {e}");
                self.stream = None;
            }
        }
    }

    /// Watch until `token` is cancelled
    pub async fn run(mut self, token: CancellationToken) {
        log::info!(
            "[grpc] Started config watcher (client id {:?}, restart counter {})",
            self.client_id,
            self.self_restart_counter
        );

        let mut tick = tokio::time::interval(self.tick);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if let Some(stream) = self.stream.as_mut() {
                let received = tokio::select! {
                    _ = token.cancelled() => break,
                    received = stream.next_snapshot() => received,
                };
                self.on_stream_event(received);
                continue;
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tick.tick() => {}
            }
            self.step().await;
        }

        log::info!("[grpc] Config watcher stopped");
    }
}

/// Client id presented to the configuration service
pub fn client_id_from_env() -> String {
    std::env::var("HOSTNAME").unwrap_or_default()
}
