//! Slice configuration ingestion
//!
//! Wire types of the configuration service, their normalization into the
//! store representation, and the apply step shared by the HTTP poller and
//! the gRPC watcher: diff against the last raw snapshot, publish PLMN list
//! changes, and overwrite the per-PLMN slice mapping.

use std::sync::Arc;

use ogs_sbi::{PlmnId, Snssai};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config_store::{ConfigStore, SupportedNssaiInPlmn};
use crate::grpc_config::{GrpcSliceConfigConnector, SliceConfigConnector, SliceConfigWatcher};
use crate::polling::NfConfigPoller;

/// One entry of `GET /nfconfig/plmn-snssai`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlmnSnssai {
    pub plmn_id: PlmnId,
    #[serde(rename = "sNssaiList", default)]
    pub s_nssai_list: Vec<ConfigSnssai>,
}

/// S-NSSAI as sent by the configuration service (SD may be absent)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSnssai {
    pub sst: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sd: Option<String>,
}

impl From<&ConfigSnssai> for Snssai {
    fn from(s: &ConfigSnssai) -> Self {
        Snssai::from_optional_sd(s.sst, s.sd.clone())
    }
}

/// Derive the PLMN list and per-PLMN slice mapping from a raw snapshot.
///
/// Duplicate PLMN entries are merged (slice sets unioned); the PLMN list
/// keeps the first occurrence of each PLMN in input order.
pub fn convert_plmn_snssai_list(list: &[PlmnSnssai]) -> (Vec<PlmnId>, SupportedNssaiInPlmn) {
    let mut plmn_list = Vec::with_capacity(list.len());
    let mut nssai = SupportedNssaiInPlmn::with_capacity(list.len());

    for entry in list {
        if !nssai.contains_key(&entry.plmn_id) {
            plmn_list.push(entry.plmn_id.clone());
        }
        nssai
            .entry(entry.plmn_id.clone())
            .or_default()
            .extend(entry.s_nssai_list.iter().map(Snssai::from));
    }

    (plmn_list, nssai)
}

/// Sending half of the PLMN-change channel (latest value wins)
pub type PlmnConfigSender = watch::Sender<Vec<PlmnId>>;
/// Receiving half of the PLMN-change channel
pub type PlmnConfigReceiver = watch::Receiver<Vec<PlmnId>>;

/// Single-slot channel: a publish replaces any value not yet consumed
pub fn plmn_config_channel() -> (PlmnConfigSender, PlmnConfigReceiver) {
    watch::channel(Vec::new())
}

/// Result of applying a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Same raw snapshot as last time
    Unchanged,
    /// Store updated; `plmn_changed` tells whether the PLMN list was published
    Applied { plmn_changed: bool },
}

/// Diff/publish/update step shared by both ingestion strategies
pub struct NssaiConfigApplier {
    store: Arc<ConfigStore>,
    plmn_tx: PlmnConfigSender,
    last_raw: Option<Vec<PlmnSnssai>>,
    last_plmn_list: Vec<PlmnId>,
}

impl NssaiConfigApplier {
    /// The last published PLMN list starts out as the store's seeded list
    pub fn new(store: Arc<ConfigStore>, plmn_tx: PlmnConfigSender) -> Self {
        let last_plmn_list = store.supported_plmn_list();
        Self {
            store,
            plmn_tx,
            last_raw: None,
            last_plmn_list,
        }
    }

    /// Apply a full-replacement snapshot
    pub fn apply(&mut self, raw: Vec<PlmnSnssai>) -> ApplyOutcome {
        if self.last_raw.as_ref() == Some(&raw) {
            return ApplyOutcome::Unchanged;
        }

        let (plmn_list, nssai) = convert_plmn_snssai_list(&raw);
        self.last_raw = Some(raw);

        let Self {
            store,
            plmn_tx,
            last_plmn_list,
            ..
        } = self;

        store.update(|cfg| {
            let plmn_changed = *last_plmn_list != plmn_list;
            if plmn_changed {
                log::info!("PLMN config changed: {plmn_list:?}");
                *last_plmn_list = plmn_list.clone();
                plmn_tx.send_replace(plmn_list.clone());
                cfg.supported_plmn_list = plmn_list;
            }
            cfg.supported_nssai_in_plmn = nssai;
            ApplyOutcome::Applied { plmn_changed }
        })
    }
}

/// Configuration ingestion strategy, chosen once at startup
pub enum ConfigSource<C: SliceConfigConnector = GrpcSliceConfigConnector> {
    /// Pull from the configuration HTTP endpoint
    Polling(NfConfigPoller),
    /// Subscribe to the configuration gRPC stream
    Streaming(SliceConfigWatcher<C>),
}

impl<C: SliceConfigConnector> ConfigSource<C> {
    pub fn name(&self) -> &'static str {
        match self {
            ConfigSource::Polling(_) => "polling",
            ConfigSource::Streaming(_) => "streaming",
        }
    }

    /// Run until `token` is cancelled
    pub async fn run(self, token: CancellationToken) {
        match self {
            ConfigSource::Polling(poller) => poller.run(token).await,
            ConfigSource::Streaming(watcher) => watcher.run(token).await,
        }
    }
}
