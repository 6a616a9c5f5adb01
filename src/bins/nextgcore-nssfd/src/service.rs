//! NSSF Service Tasks
//!
//! Spawns the lifecycle coordinator and the configuration ingestion path and
//! tears them down in order: cancel, join the coordinator, deregister once,
//! join ingestion.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config_store::ConfigStore;
use crate::context::SharedNssfContext;
use crate::grpc_config::SliceConfigConnector;
use crate::nf_config::{ConfigSource, PlmnConfigReceiver};
use crate::nf_sm::{nssf_nf_deregister, NfInstanceSm};
use crate::nnrf_client::{DeregisterOutcome, NrfClient};

pub struct NssfServices<N: NrfClient> {
    token: CancellationToken,
    nrf: Arc<N>,
    context: SharedNssfContext,
    lifecycle: JoinHandle<()>,
    ingestion: JoinHandle<()>,
}

impl<N: NrfClient> NssfServices<N> {
    pub fn start<C>(
        nrf: Arc<N>,
        context: SharedNssfContext,
        store: Arc<ConfigStore>,
        plmn_rx: PlmnConfigReceiver,
        source: ConfigSource<C>,
        token: CancellationToken,
    ) -> Self
    where
        C: SliceConfigConnector,
    {
        log::info!("Starting config ingestion ({})", source.name());
        let ingestion = tokio::spawn(source.run(token.child_token()));

        let sm = NfInstanceSm::new(nrf.clone(), context.clone(), store);
        let lifecycle = tokio::spawn(sm.run(plmn_rx, token.child_token()));

        Self {
            token,
            nrf,
            context,
            lifecycle,
            ingestion,
        }
    }

    pub async fn terminate(self) -> DeregisterOutcome {
        log::info!("NSSF terminating...");
        self.token.cancel();

        if let Err(e) = self.lifecycle.await {
            log::error!("NF state machine task failed: {e}");
        }

        let outcome = nssf_nf_deregister(self.nrf.as_ref(), &self.context).await;

        if let Err(e) = self.ingestion.await {
            log::error!("Config ingestion task failed: {e}");
        }

        log::info!("NSSF terminated");
        outcome
    }
}
