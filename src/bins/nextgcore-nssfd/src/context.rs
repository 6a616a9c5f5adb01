//! NSSF Context Management
//!
//! Registration identity and SBI advertisement data of this NSSF instance.
//! The context is owned by the lifecycle coordinator and shared with the
//! shutdown path through [`SharedNssfContext`].

use std::sync::Arc;

use ogs_sbi::{NfService, UriScheme};
use tokio::sync::Mutex;

use crate::config::NssfConfig;

/// Default SBI registration/binding address
pub const NSSF_DEFAULT_IPV4: &str = "127.0.0.31";
/// Default SBI port
pub const NSSF_DEFAULT_PORT: u16 = 8000;

/// Registration lifecycle state of this NF instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NfState {
    #[default]
    Unregistered,
    Registering,
    Registered,
    Updating,
    Deregistering,
    Stopped,
}

impl NfState {
    pub fn name(&self) -> &'static str {
        match self {
            NfState::Unregistered => "UNREGISTERED",
            NfState::Registering => "REGISTERING",
            NfState::Registered => "REGISTERED",
            NfState::Updating => "UPDATING",
            NfState::Deregistering => "DEREGISTERING",
            NfState::Stopped => "STOPPED",
        }
    }

    /// True once shutdown has begun
    pub fn is_final(&self) -> bool {
        matches!(self, NfState::Deregistering | NfState::Stopped)
    }
}

/// NSSF context
#[derive(Debug, Clone)]
pub struct NssfContext {
    /// NF instance id, replaced when the NRF assigns a new one
    pub nf_id: String,
    /// Registry base URI, replaced when the NRF redirects us
    pub nrf_uri: String,
    /// Optional human-readable name
    pub nf_name: Option<String>,
    pub uri_scheme: UriScheme,
    /// Address advertised in the NF profile
    pub register_ipv4: String,
    /// Address the SBI listener binds to
    pub binding_ipv4: String,
    pub sbi_port: u16,
    pub pem_path: Option<String>,
    pub key_path: Option<String>,
    /// Services advertised in the NF profile
    pub nf_services: Vec<NfService>,
    /// Heartbeat interval offered to the NRF, in seconds
    pub heartbeat_timer: Option<u32>,
    state: NfState,
}

/// Context shared between the coordinator and the shutdown path
pub type SharedNssfContext = Arc<Mutex<NssfContext>>;

impl NssfContext {
    pub fn new(nf_id: impl Into<String>, nrf_uri: impl Into<String>) -> Self {
        Self {
            nf_id: nf_id.into(),
            nrf_uri: nrf_uri.into(),
            nf_name: None,
            uri_scheme: UriScheme::Http,
            register_ipv4: NSSF_DEFAULT_IPV4.to_string(),
            binding_ipv4: NSSF_DEFAULT_IPV4.to_string(),
            sbi_port: NSSF_DEFAULT_PORT,
            pem_path: None,
            key_path: None,
            nf_services: Vec::new(),
            heartbeat_timer: None,
            state: NfState::Unregistered,
        }
    }

    /// Build the context from a validated configuration
    pub fn from_config(nf_id: impl Into<String>, config: &NssfConfig) -> Self {
        let cfg = &config.configuration;
        let mut ctx = Self::new(nf_id, cfg.nrf_uri.trim_end_matches('/'));

        ctx.nf_name = cfg.nssf_name.clone();
        ctx.uri_scheme = cfg.sbi.scheme;
        ctx.register_ipv4 = non_empty_or_default(&cfg.sbi.register_ipv4);
        ctx.binding_ipv4 = non_empty_or_default(&cfg.sbi.binding_ipv4);
        if cfg.sbi.port != 0 {
            ctx.sbi_port = cfg.sbi.port;
        }
        if let Some(tls) = &cfg.sbi.tls {
            ctx.pem_path = Some(tls.pem.clone());
            ctx.key_path = Some(tls.key.clone());
        }
        ctx.heartbeat_timer = cfg.heartbeat_timer.filter(|secs| *secs > 0);
        ctx.nf_services = crate::nnrf_build::nssf_nnrf_build_nf_services(
            &cfg.service_name_list,
            ctx.uri_scheme,
            &ctx.register_ipv4,
            ctx.sbi_port,
        );
        ctx
    }

    pub fn state(&self) -> NfState {
        self.state
    }

    /// Move to `state`, logging the transition
    pub fn set_state(&mut self, state: NfState) {
        if self.state != state {
            log::debug!("[{}] {} -> {}", self.nf_id, self.state.name(), state.name());
            self.state = state;
        }
    }

    /// `{nrfUri}/nnrf-nfm/v1/nf-instances/{nfId}`
    pub fn nf_instance_uri(&self) -> String {
        nf_instance_uri(&self.nrf_uri, &self.nf_id)
    }

    pub fn into_shared(self) -> SharedNssfContext {
        Arc::new(Mutex::new(self))
    }
}

/// Resource URI of an NF instance on the NRF
pub fn nf_instance_uri(nrf_uri: &str, nf_id: &str) -> String {
    format!("{nrf_uri}/nnrf-nfm/v1/nf-instances/{nf_id}")
}

fn non_empty_or_default(addr: &str) -> String {
    if addr.is_empty() {
        NSSF_DEFAULT_IPV4.to_string()
    } else {
        addr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_defaults() {
        let ctx = NssfContext::new("nf-1", "http://nrf:8000");
        assert_eq!(ctx.register_ipv4, NSSF_DEFAULT_IPV4);
        assert_eq!(ctx.sbi_port, NSSF_DEFAULT_PORT);
        assert_eq!(ctx.state(), NfState::Unregistered);
        assert_eq!(
            ctx.nf_instance_uri(),
            "http://nrf:8000/nnrf-nfm/v1/nf-instances/nf-1"
        );
    }

    #[test]
    fn test_set_state() {
        let mut ctx = NssfContext::new("nf-1", "http://nrf:8000");
        ctx.set_state(NfState::Registering);
        ctx.set_state(NfState::Registered);
        assert_eq!(ctx.state(), NfState::Registered);
        assert!(!ctx.state().is_final());

        ctx.set_state(NfState::Deregistering);
        assert!(ctx.state().is_final());
    }

    #[test]
    fn test_from_config() {
        let yaml = r#"
info:
  version: 1.0.0
configuration:
  sbi:
    scheme: http
    registerIPv4: 10.0.0.5
    bindingIPv4: 0.0.0.0
    port: 29531
  serviceNameList:
    - nnssf-nsselection
    - nnssf-nssaiavailability
  nrfUri: http://nrf:29510/
  webuiUri: http://webui:5001
  heartbeatTimer: 10
"#;
        let config = NssfConfig::from_yaml_str(yaml).unwrap();
        let ctx = NssfContext::from_config("nf-1", &config);

        assert_eq!(ctx.nrf_uri, "http://nrf:29510");
        assert_eq!(ctx.register_ipv4, "10.0.0.5");
        assert_eq!(ctx.binding_ipv4, "0.0.0.0");
        assert_eq!(ctx.sbi_port, 29531);
        assert_eq!(ctx.heartbeat_timer, Some(10));
        assert_eq!(ctx.nf_services.len(), 2);
        assert_eq!(ctx.nf_services[1].service_instance_id, "1");
    }

    #[test]
    fn test_from_config_defaults_addresses() {
        let yaml = r#"
info:
  version: 1.0.0
configuration:
  nrfUri: http://nrf:29510
  webuiUri: http://webui:5001
"#;
        let config = NssfConfig::from_yaml_str(yaml).unwrap();
        let ctx = NssfContext::from_config("nf-1", &config);

        assert_eq!(ctx.register_ipv4, NSSF_DEFAULT_IPV4);
        assert_eq!(ctx.binding_ipv4, NSSF_DEFAULT_IPV4);
        assert_eq!(ctx.sbi_port, NSSF_DEFAULT_PORT);
        assert!(ctx.nf_services.is_empty());
        assert!(ctx.pem_path.is_none());
    }
}
