//! Configuration Poller
//!
//! Pulls `GET {webui}/nfconfig/plmn-snssai` on a timer. The polling interval
//! doubles on every failed fetch up to a cap and resets on success; the loop
//! never stops on error, only on cancellation.

use std::time::Duration;

use ogs_sbi::{SbiClient, SbiClientConfig, SbiError, SbiRequest, CONTENT_TYPE_JSON};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::nf_config::{ApplyOutcome, NssaiConfigApplier, PlmnSnssai};

/// Interval used at start and after every successful fetch
pub const INITIAL_POLLING_INTERVAL: Duration = Duration::from_secs(5);
/// Upper bound of the polling interval
pub const POLLING_MAX_BACKOFF: Duration = Duration::from_secs(40);
/// Interval multiplier applied on every failed fetch
pub const POLLING_BACKOFF_FACTOR: u32 = 2;
/// Configuration resource on the webui
pub const POLLING_PATH: &str = "/nfconfig/plmn-snssai";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport failure: {0}")]
    Transport(#[from] SbiError),

    #[error("unexpected Content-Type: {0:?}")]
    UnexpectedContentType(Option<String>),

    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),

    #[error("malformed body: {0}")]
    MalformedBody(#[from] serde_json::Error),
}

/// Next interval after a failed fetch
pub fn next_backoff(current: Duration, max: Duration) -> Duration {
    current
        .checked_mul(POLLING_BACKOFF_FACTOR)
        .map_or(max, |next| next.min(max))
}

/// Exponential backoff state of the poller
#[derive(Debug, Clone)]
pub struct PollingBackoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl PollingBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            current: initial,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// Double (capped) and return the new interval
    pub fn on_failure(&mut self) -> Duration {
        self.current = next_backoff(self.current, self.max);
        self.current
    }

    pub fn on_success(&mut self) {
        self.current = self.initial;
    }
}

impl Default for PollingBackoff {
    fn default() -> Self {
        Self::new(INITIAL_POLLING_INTERVAL, POLLING_MAX_BACKOFF)
    }
}

/// HTTP configuration poller
pub struct NfConfigPoller {
    client: SbiClient,
    endpoint: String,
    backoff: PollingBackoff,
    applier: NssaiConfigApplier,
}

impl NfConfigPoller {
    /// Poll `{webui_uri}/nfconfig/plmn-snssai`.
    ///
    /// Each request times out after the initial interval.
    pub fn new(webui_uri: &str, backoff: PollingBackoff, applier: NssaiConfigApplier) -> Self {
        let client = SbiClient::new(
            SbiClientConfig::new()
                .with_http1()
                .with_connect_timeout(backoff.initial)
                .with_request_timeout(backoff.initial),
        );
        Self {
            client,
            endpoint: format!("{}{POLLING_PATH}", webui_uri.trim_end_matches('/')),
            backoff,
            applier,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn current_interval(&self) -> Duration {
        self.backoff.current()
    }

    /// Fetch the configuration once
    pub async fn fetch_once(&self) -> Result<Vec<PlmnSnssai>, FetchError> {
        let request = SbiRequest::get(&self.endpoint).with_header("Accept", CONTENT_TYPE_JSON);
        let response = self.client.send_request(request).await?;

        let content_type = response.content_type();
        if !content_type.map_or(false, |ct| ct.contains(CONTENT_TYPE_JSON)) {
            return Err(FetchError::UnexpectedContentType(
                content_type.map(str::to_string),
            ));
        }

        match response.status {
            200 => {
                let body = response.http.content.as_deref().unwrap_or_default();
                Ok(serde_json::from_str(body)?)
            }
            status => Err(FetchError::UnexpectedStatus(status)),
        }
    }

    /// One poll: fetch, adjust the backoff, apply on success
    pub async fn poll_once(&mut self) -> Result<ApplyOutcome, FetchError> {
        match self.fetch_once().await {
            Ok(config) => {
                self.backoff.on_success();
                let outcome = self.applier.apply(config);
                if outcome == ApplyOutcome::Unchanged {
                    log::debug!("[poll] PLMN config unchanged");
                }
                Ok(outcome)
            }
            Err(e) => {
                let next = self.backoff.on_failure();
                log::error!("[poll] Polling error. Retrying in {} seconds: {e}", next.as_secs());
                Err(e)
            }
        }
    }

    /// Poll until `token` is cancelled
    pub async fn run(mut self, token: CancellationToken) {
        log::info!("[poll] Started polling {}", self.endpoint);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.backoff.current()) => {}
            }

            // a started fetch is bounded by the request timeout
            let _ = self.poll_once().await;
        }

        log::info!("[poll] Polling loop stopped");
    }
}
