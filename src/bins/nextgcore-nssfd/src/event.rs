//! NSSF Event Definitions
//!
//! Events dispatched to the lifecycle coordinator

use ogs_sbi::PlmnId;

/// Timer IDs for NSSF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NssfTimerId {
    NfInstanceHeartbeatInterval,
}

impl NssfTimerId {
    pub fn name(&self) -> &'static str {
        match self {
            NssfTimerId::NfInstanceHeartbeatInterval => "NF_INSTANCE_HEARTBEAT_INTERVAL",
        }
    }
}

/// NSSF event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NssfEvent {
    /// The ingestion path published a new supported PLMN list
    PlmnConfigChanged(Vec<PlmnId>),
    /// A timer armed under `generation` expired
    Timer { timer_id: NssfTimerId, generation: u64 },
}

impl NssfEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NssfEvent::PlmnConfigChanged(_) => "PLMN_CONFIG_CHANGED",
            NssfEvent::Timer { timer_id, .. } => timer_id.name(),
        }
    }
}
