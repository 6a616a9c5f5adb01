//! NF Instance State Machine
//!
//! Lifecycle of this NSSF's registration with the NRF:
//!
//! ```text
//! Unregistered -> Registering -> Registered <-> Updating
//!                      ^                           |
//!                      +---- heartbeat rejected ---+
//! any -> Deregistering -> Stopped   (shutdown)
//! ```
//!
//! Registration policy depends on what triggered it:
//! - boot: retried every 2s until the NRF accepts or shutdown begins
//! - PLMN config change: a single attempt
//! - lost heartbeat: a single attempt; on failure the heartbeat timer is
//!   rearmed so the next expiry tries again

use std::sync::Arc;
use std::time::Duration;

use ogs_sbi::PlmnId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config_store::ConfigStore;
use crate::context::{NfState, NssfContext, SharedNssfContext};
use crate::event::{NssfEvent, NssfTimerId};
use crate::nf_config::PlmnConfigReceiver;
use crate::nnrf_build::{nssf_nnrf_build_heartbeat_patch, nssf_nnrf_build_nf_profile};
use crate::nnrf_client::{DeregisterOutcome, NrfClient, RegisterOutcome, UpdateOutcome};
use crate::timer::{defaults, HeartbeatTimer};

/// Whether a rejected heartbeat means the NRF lost our registration
pub fn heartbeat_requires_reregistration(status: Option<i32>) -> bool {
    matches!(status, Some(400) | Some(404) | Some(500..=599))
}

/// Lifecycle coordinator of the NF instance
pub struct NfInstanceSm<N: NrfClient> {
    nrf: Arc<N>,
    context: SharedNssfContext,
    store: Arc<ConfigStore>,
    heartbeat: HeartbeatTimer,
    events: mpsc::UnboundedReceiver<NssfEvent>,
    registration_retry: Duration,
}

impl<N: NrfClient> NfInstanceSm<N> {
    pub fn new(nrf: Arc<N>, context: SharedNssfContext, store: Arc<ConfigStore>) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        Self {
            nrf,
            context,
            store,
            heartbeat: HeartbeatTimer::new(tx),
            events,
            registration_retry: defaults::NF_INSTANCE_REGISTRATION_RETRY,
        }
    }

    pub fn with_registration_retry(mut self, retry: Duration) -> Self {
        self.registration_retry = retry;
        self
    }

    pub fn heartbeat(&self) -> &HeartbeatTimer {
        &self.heartbeat
    }

    /// Register once with a profile built from the current store snapshot.
    /// Caller holds the context lock.
    async fn register(&self, ctx: &mut NssfContext) -> bool {
        ctx.set_state(NfState::Registering);

        let profile = nssf_nnrf_build_nf_profile(ctx, self.store.supported_plmn_list());
        let outcome = self.nrf.register(&ctx.nrf_uri, &ctx.nf_id, &profile).await;
        let heartbeat_secs = outcome
            .profile()
            .and_then(|p| p.heartbeat_interval())
            .or(profile.heartbeat_interval());

        match outcome {
            RegisterOutcome::Created { location, .. } => {
                if location.nf_instance_id != ctx.nf_id {
                    log::info!(
                        "[nrf] NF instance id changed {} -> {}",
                        ctx.nf_id,
                        location.nf_instance_id
                    );
                }
                ctx.nf_id = location.nf_instance_id;
                ctx.nrf_uri = location.nrf_uri;
                log::info!("[{}] NF registered (created) at {}", ctx.nf_id, ctx.nrf_uri);
            }
            RegisterOutcome::Updated { .. } => {
                log::info!("[{}] NF registered (updated)", ctx.nf_id);
            }
            RegisterOutcome::Failed(e) => {
                log::error!("[{}] NF registration failed: {e}", ctx.nf_id);
                ctx.set_state(NfState::Unregistered);
                return false;
            }
        }

        ctx.set_state(NfState::Registered);
        self.heartbeat.start(heartbeat_secs);
        true
    }

    /// Boot-time registration: retry until accepted or cancelled
    pub async fn register_on_boot(&self, token: &CancellationToken) -> bool {
        loop {
            {
                let mut ctx = self.context.lock().await;
                if self.register(&mut ctx).await {
                    return true;
                }
            }

            log::warn!(
                "[nrf] Retrying registration in {}s",
                self.registration_retry.as_secs_f32()
            );
            tokio::select! {
                _ = token.cancelled() => return false,
                _ = tokio::time::sleep(self.registration_retry) => {}
            }
        }
    }

    pub async fn dispatch(&mut self, event: NssfEvent) {
        log::debug!("nssf_nf_sm: {}", event.name());

        match event {
            NssfEvent::PlmnConfigChanged(plmn_list) => {
                self.handle_plmn_config_changed(plmn_list).await
            }
            NssfEvent::Timer {
                timer_id: NssfTimerId::NfInstanceHeartbeatInterval,
                generation,
            } => self.handle_heartbeat_expired(generation).await,
        }
    }

    async fn handle_plmn_config_changed(&mut self, plmn_list: Vec<PlmnId>) {
        let mut ctx = self.context.lock().await;
        if ctx.state().is_final() {
            return;
        }
        log::info!("[{}] PLMN config changed {plmn_list:?}, re-registering", ctx.nf_id);
        self.register(&mut ctx).await;
    }

    async fn handle_heartbeat_expired(&mut self, generation: u64) {
        if !self.heartbeat.is_current(generation) {
            log::debug!("[nrf] Stale heartbeat expiry ignored");
            return;
        }

        let mut ctx = self.context.lock().await;
        if ctx.state().is_final() {
            return;
        }
        ctx.set_state(NfState::Updating);

        let patch = nssf_nnrf_build_heartbeat_patch();
        match self.nrf.update(&ctx.nrf_uri, &ctx.nf_id, &patch).await {
            UpdateOutcome::Success(profile) => {
                ctx.set_state(NfState::Registered);
                self.heartbeat
                    .refresh(profile.and_then(|p| p.heartbeat_interval()));
                return;
            }
            UpdateOutcome::Rejected(problem) if heartbeat_requires_reregistration(problem.status) => {
                log::warn!(
                    "[{}] Heartbeat rejected ({:?}), registration lost",
                    ctx.nf_id,
                    problem.status
                );
            }
            UpdateOutcome::Rejected(problem) => {
                log::error!(
                    "[{}] Heartbeat rejected ({:?} {:?})",
                    ctx.nf_id,
                    problem.status,
                    problem.cause
                );
                ctx.set_state(NfState::Registered);
                self.heartbeat.refresh(None);
                return;
            }
            UpdateOutcome::Failed(e) => {
                log::warn!("[{}] Heartbeat failed: {e}", ctx.nf_id);
            }
        }

        if !self.register(&mut ctx).await {
            self.heartbeat.refresh(None);
        }
    }

    /// Event loop: boot registration, then PLMN changes and heartbeat
    /// expiries until `token` is cancelled. The heartbeat timer is stopped
    /// on exit.
    pub async fn run(mut self, mut plmn_rx: PlmnConfigReceiver, token: CancellationToken) {
        if self.register_on_boot(&token).await {
            // anything published before boot completed is already in the profile
            plmn_rx.borrow_and_update();
        }

        let mut plmn_open = true;
        loop {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                changed = plmn_rx.changed(), if plmn_open => match changed {
                    Ok(()) => NssfEvent::PlmnConfigChanged(plmn_rx.borrow_and_update().clone()),
                    Err(_) => {
                        plmn_open = false;
                        continue;
                    }
                },
                Some(event) = self.events.recv() => event,
            };
            self.dispatch(event).await;
        }

        self.heartbeat.stop();
        log::info!("[nrf] NF state machine stopped");
    }
}

/// Deregister once; the outcome is logged, never retried
pub async fn nssf_nf_deregister<N: NrfClient>(nrf: &N, context: &SharedNssfContext) -> DeregisterOutcome {
    let mut ctx = context.lock().await;
    ctx.set_state(NfState::Deregistering);

    let outcome = nrf.deregister(&ctx.nrf_uri, &ctx.nf_id).await;
    match &outcome {
        DeregisterOutcome::Success => log::info!("[{}] NF de-registered", ctx.nf_id),
        DeregisterOutcome::Failed(e) => log::error!("[{}] NF de-registration failed: {e}", ctx.nf_id),
    }

    ctx.set_state(NfState::Stopped);
    outcome
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config_store::NssaiConfig;
    use crate::nf_config::plmn_config_channel;
    use crate::nnrf_client::{NfInstanceLocation, NrfFailure};
    use async_trait::async_trait;
    use ogs_sbi::{NfProfile, NfType, PatchItem, ProblemDetails, SbiError};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Calls observed by [`MockNrf`], in order
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) enum NrfCall {
        Register {
            nrf_uri: String,
            nf_id: String,
            plmn_list: Option<Vec<PlmnId>>,
        },
        Update { nrf_uri: String, nf_id: String },
        Deregister { nrf_uri: String, nf_id: String },
    }

    /// Scripted NRF; unscripted calls succeed
    #[derive(Default)]
    pub(crate) struct MockNrf {
        pub calls: Mutex<Vec<NrfCall>>,
        pub register_outcomes: Mutex<VecDeque<RegisterOutcome>>,
        pub update_outcomes: Mutex<VecDeque<UpdateOutcome>>,
    }

    impl MockNrf {
        pub fn calls(&self) -> Vec<NrfCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn push_register(&self, outcome: RegisterOutcome) {
            self.register_outcomes.lock().unwrap().push_back(outcome);
        }

        pub fn push_update(&self, outcome: UpdateOutcome) {
            self.update_outcomes.lock().unwrap().push_back(outcome);
        }

        pub fn count(&self, f: impl Fn(&NrfCall) -> bool) -> usize {
            self.calls().iter().filter(|c| f(c)).count()
        }
    }

    #[async_trait]
    impl NrfClient for MockNrf {
        async fn register(&self, nrf_uri: &str, nf_instance_id: &str, profile: &NfProfile) -> RegisterOutcome {
            self.calls.lock().unwrap().push(NrfCall::Register {
                nrf_uri: nrf_uri.to_string(),
                nf_id: nf_instance_id.to_string(),
                plmn_list: profile.plmn_list.clone(),
            });
            self.register_outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(RegisterOutcome::Updated { profile: None })
        }

        async fn update(&self, nrf_uri: &str, nf_instance_id: &str, _patch: &[PatchItem]) -> UpdateOutcome {
            self.calls.lock().unwrap().push(NrfCall::Update {
                nrf_uri: nrf_uri.to_string(),
                nf_id: nf_instance_id.to_string(),
            });
            self.update_outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(UpdateOutcome::Success(None))
        }

        async fn deregister(&self, nrf_uri: &str, nf_instance_id: &str) -> DeregisterOutcome {
            self.calls.lock().unwrap().push(NrfCall::Deregister {
                nrf_uri: nrf_uri.to_string(),
                nf_id: nf_instance_id.to_string(),
            });
            DeregisterOutcome::Success
        }
    }

    pub(crate) fn is_register(call: &NrfCall) -> bool {
        matches!(call, NrfCall::Register { .. })
    }

    fn failed() -> RegisterOutcome {
        RegisterOutcome::Failed(NrfFailure::Transport(SbiError::Timeout))
    }

    fn profile_with_heartbeat(secs: u32) -> Option<NfProfile> {
        let mut profile = NfProfile::new("nf-1", NfType::Nssf);
        profile.heart_beat_timer = Some(secs);
        Some(profile)
    }

    fn setup() -> (NfInstanceSm<MockNrf>, Arc<MockNrf>, SharedNssfContext) {
        let nrf = Arc::new(MockNrf::default());
        let context = NssfContext::new("nf-1", "http://nrf:8000").into_shared();
        let store = Arc::new(ConfigStore::with_config(NssaiConfig {
            supported_plmn_list: vec![PlmnId::new("208", "93")],
            ..Default::default()
        }));
        let sm = NfInstanceSm::new(nrf.clone(), context.clone(), store);
        (sm, nrf, context)
    }

    async fn expire_heartbeat(sm: &mut NfInstanceSm<MockNrf>) {
        let event = sm.events.recv().await.unwrap();
        sm.dispatch(event).await;
    }

    #[test]
    fn test_heartbeat_requires_reregistration() {
        assert!(heartbeat_requires_reregistration(Some(404)));
        assert!(heartbeat_requires_reregistration(Some(400)));
        assert!(heartbeat_requires_reregistration(Some(503)));
        assert!(!heartbeat_requires_reregistration(Some(403)));
        assert!(!heartbeat_requires_reregistration(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_boot_register_created_updates_context() {
        let (sm, nrf, context) = setup();
        nrf.push_register(RegisterOutcome::Created {
            profile: profile_with_heartbeat(10),
            location: NfInstanceLocation {
                nrf_uri: "http://nrf-2:8000".into(),
                nf_instance_id: "abc-123".into(),
            },
        });

        assert!(sm.register_on_boot(&CancellationToken::new()).await);

        let ctx = context.lock().await;
        assert_eq!(ctx.nf_id, "abc-123");
        assert_eq!(ctx.nrf_uri, "http://nrf-2:8000");
        assert_eq!(ctx.state(), NfState::Registered);
        assert_eq!(sm.heartbeat().interval(), Some(Duration::from_secs(10)));
        assert_eq!(
            nrf.calls(),
            vec![NrfCall::Register {
                nrf_uri: "http://nrf:8000".into(),
                nf_id: "nf-1".into(),
                plmn_list: Some(vec![PlmnId::new("208", "93")]),
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_boot_register_retries_until_accepted() {
        let (sm, nrf, _) = setup();
        nrf.push_register(failed());
        nrf.push_register(failed());

        let started = tokio::time::Instant::now();
        assert!(sm.register_on_boot(&CancellationToken::new()).await);

        assert_eq!(nrf.count(is_register), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        assert_eq!(sm.heartbeat().interval(), Some(Duration::from_secs(60)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_boot_register_stops_on_cancel() {
        let (sm, nrf, context) = setup();
        for _ in 0..10 {
            nrf.push_register(failed());
        }
        let token = CancellationToken::new();
        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(3)).await;
                token.cancel();
            })
        };

        assert!(!sm.register_on_boot(&token).await);
        canceller.await.unwrap();
        assert_eq!(nrf.count(is_register), 2);
        assert_eq!(context.lock().await.state(), NfState::Unregistered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_plmn_change_single_attempt() {
        let (mut sm, nrf, context) = setup();
        nrf.push_register(failed());

        sm.dispatch(NssfEvent::PlmnConfigChanged(vec![PlmnId::new("001", "01")]))
            .await;

        assert_eq!(nrf.count(is_register), 1);
        assert_eq!(context.lock().await.state(), NfState::Unregistered);
        assert!(sm.heartbeat().interval().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_success_refreshes_interval() {
        let (mut sm, nrf, _) = setup();
        nrf.push_register(RegisterOutcome::Updated {
            profile: profile_with_heartbeat(10),
        });
        sm.register_on_boot(&CancellationToken::new()).await;

        nrf.push_update(UpdateOutcome::Success(None));
        expire_heartbeat(&mut sm).await;
        assert_eq!(sm.heartbeat().interval(), Some(Duration::from_secs(10)));

        nrf.push_update(UpdateOutcome::Success(profile_with_heartbeat(30)));
        expire_heartbeat(&mut sm).await;
        assert_eq!(sm.heartbeat().interval(), Some(Duration::from_secs(30)));

        assert_eq!(nrf.count(|c| matches!(c, NrfCall::Update { .. })), 2);
        assert_eq!(nrf.count(is_register), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_404_registers_exactly_once() {
        let (mut sm, nrf, context) = setup();
        nrf.push_register(RegisterOutcome::Updated {
            profile: profile_with_heartbeat(10),
        });
        sm.register_on_boot(&CancellationToken::new()).await;

        nrf.push_update(UpdateOutcome::Rejected(ProblemDetails::with_status(404)));
        nrf.push_register(RegisterOutcome::Updated {
            profile: profile_with_heartbeat(20),
        });
        expire_heartbeat(&mut sm).await;

        let calls = nrf.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[1], NrfCall::Update { .. }));
        assert!(is_register(&calls[2]));
        assert_eq!(sm.heartbeat().interval(), Some(Duration::from_secs(20)));
        assert_eq!(context.lock().await.state(), NfState::Registered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_transport_failure_falls_back() {
        let (mut sm, nrf, _) = setup();
        nrf.push_register(RegisterOutcome::Updated {
            profile: profile_with_heartbeat(10),
        });
        sm.register_on_boot(&CancellationToken::new()).await;

        nrf.push_update(UpdateOutcome::Failed(NrfFailure::Transport(SbiError::Timeout)));
        nrf.push_register(failed());
        expire_heartbeat(&mut sm).await;

        // failed fallback keeps the heartbeat cadence
        assert_eq!(nrf.count(is_register), 2);
        assert_eq!(sm.heartbeat().interval(), Some(Duration::from_secs(10)));

        nrf.push_update(UpdateOutcome::Failed(NrfFailure::Transport(SbiError::Timeout)));
        expire_heartbeat(&mut sm).await;
        assert_eq!(nrf.count(is_register), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_other_rejection_keeps_registration() {
        let (mut sm, nrf, _) = setup();
        nrf.push_register(RegisterOutcome::Updated {
            profile: profile_with_heartbeat(10),
        });
        sm.register_on_boot(&CancellationToken::new()).await;

        nrf.push_update(UpdateOutcome::Rejected(ProblemDetails::with_status(403)));
        expire_heartbeat(&mut sm).await;

        assert_eq!(nrf.count(is_register), 1);
        assert_eq!(sm.heartbeat().interval(), Some(Duration::from_secs(10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_heartbeat_ignored() {
        let (mut sm, nrf, _) = setup();
        sm.dispatch(NssfEvent::Timer {
            timer_id: NssfTimerId::NfInstanceHeartbeatInterval,
            generation: 99,
        })
        .await;
        assert!(nrf.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_reregisters_on_plmn_change() {
        let (sm, nrf, _) = setup();
        let (tx, rx) = plmn_config_channel();
        let token = CancellationToken::new();
        let handle = tokio::spawn(sm.run(rx, token.clone()));

        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.send_replace(vec![PlmnId::new("001", "01")]);
        tokio::time::sleep(Duration::from_millis(10)).await;

        token.cancel();
        handle.await.unwrap();
        assert_eq!(nrf.count(is_register), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deregister_once() {
        let (_sm, nrf, context) = setup();

        let outcome = nssf_nf_deregister(nrf.as_ref(), &context).await;

        assert!(matches!(outcome, DeregisterOutcome::Success));
        assert_eq!(
            nrf.calls(),
            vec![NrfCall::Deregister {
                nrf_uri: "http://nrf:8000".into(),
                nf_id: "nf-1".into(),
            }]
        );
        assert_eq!(context.lock().await.state(), NfState::Stopped);
    }
}
