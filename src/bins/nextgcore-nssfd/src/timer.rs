//! NSSF Timer Management
//!
//! Single-shot NF heartbeat timer. Each arm spawns one sleeping task that
//! posts [`NssfEvent::Timer`] to the coordinator's event channel; the
//! coordinator rearms explicitly after handling the expiry. Arming, the
//! choice of interval and stopping all happen under one lock, and every arm
//! bumps a generation so that an expiry already in flight when the timer was
//! rearmed or stopped is recognized as stale.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::event::{NssfEvent, NssfTimerId};

/// Default timer durations for NSSF
pub mod defaults {
    use std::time::Duration;

    /// Heartbeat interval when the NRF does not provide one
    pub const NF_INSTANCE_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);
    /// Delay between boot-time registration attempts
    pub const NF_INSTANCE_REGISTRATION_RETRY: Duration = Duration::from_secs(2);
}

#[derive(Debug, Default)]
struct TimerState {
    interval: Option<Duration>,
    generation: u64,
    handle: Option<JoinHandle<()>>,
    stopped: bool,
}

/// Heartbeat timer of the NF instance
#[derive(Debug, Clone)]
pub struct HeartbeatTimer {
    state: Arc<Mutex<TimerState>>,
    events: mpsc::UnboundedSender<NssfEvent>,
}

fn secs_to_interval(secs: Option<u32>) -> Option<Duration> {
    secs.filter(|s| *s > 0).map(|s| Duration::from_secs(u64::from(s)))
}

impl HeartbeatTimer {
    pub fn new(events: mpsc::UnboundedSender<NssfEvent>) -> Self {
        Self {
            state: Arc::new(Mutex::new(TimerState::default())),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Arm after a successful registration: the NRF-provided interval in
    /// seconds, or the default when unset or zero.
    pub fn start(&self, heartbeat_secs: Option<u32>) -> Option<Duration> {
        let mut state = self.lock();
        let interval = secs_to_interval(heartbeat_secs)
            .unwrap_or(defaults::NF_INSTANCE_HEARTBEAT_INTERVAL);
        self.arm(&mut state, interval)
    }

    /// Rearm after a heartbeat: the NRF-provided interval, else the previous
    /// interval, else the default.
    pub fn refresh(&self, heartbeat_secs: Option<u32>) -> Option<Duration> {
        let mut state = self.lock();
        let interval = secs_to_interval(heartbeat_secs)
            .or(state.interval)
            .unwrap_or(defaults::NF_INSTANCE_HEARTBEAT_INTERVAL);
        self.arm(&mut state, interval)
    }

    fn arm(&self, state: &mut TimerState, interval: Duration) -> Option<Duration> {
        if state.stopped {
            return None;
        }
        if let Some(handle) = state.handle.take() {
            handle.abort();
        }

        state.generation += 1;
        state.interval = Some(interval);

        let generation = state.generation;
        let events = self.events.clone();
        state.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            let _ = events.send(NssfEvent::Timer {
                timer_id: NssfTimerId::NfInstanceHeartbeatInterval,
                generation,
            });
        }));

        log::debug!("[nrf] Heartbeat timer armed for {}s", interval.as_secs());
        Some(interval)
    }

    /// Cancel the pending expiry; later arms are ignored
    pub fn stop(&self) {
        let mut state = self.lock();
        state.stopped = true;
        state.generation += 1;
        if let Some(handle) = state.handle.take() {
            handle.abort();
        }
    }

    /// Whether an expiry carrying `generation` is the latest arm
    pub fn is_current(&self, generation: u64) -> bool {
        let state = self.lock();
        !state.stopped && state.generation == generation
    }

    /// Interval of the latest arm
    pub fn interval(&self) -> Option<Duration> {
        self.lock().interval
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }
}
