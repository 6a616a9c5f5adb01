//! NSSF configuration file
//!
//! YAML layout:
//!
//! ```yaml
//! info:
//!   version: 1.0.0
//! configuration:
//!   nssfName: NSSF
//!   sbi:
//!     scheme: http
//!     registerIPv4: 10.0.0.5
//!     bindingIPv4: 0.0.0.0
//!     port: 29531
//!   serviceNameList: [nnssf-nsselection, nnssf-nssaiavailability]
//!   nrfUri: http://nrf:29510
//!   webuiUri: http://webui:5001
//!   enableStreamingConfig: false
//!   supportedPlmnList:
//!     - { mcc: "208", mnc: "93" }
//! logger:
//!   level: info
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use ogs_sbi::{PlmnId, Snssai, UriScheme};
use serde::Deserialize;
use thiserror::Error;

use crate::config_store::{NssaiConfig, SupportedNssaiInPlmn};
use crate::polling::{INITIAL_POLLING_INTERVAL, POLLING_MAX_BACKOFF};

/// Only configuration schema version accepted
pub const NSSF_EXPECTED_CONFIG_VERSION: &str = "1.0.0";
/// Streaming configuration endpoint used when none is configured
pub const DEFAULT_STREAMING_CONFIG_URI: &str = "http://webui:9876";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("config version is [{found}], but expected is [{expected}]")]
    VersionMismatch { found: String, expected: &'static str },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration document
#[derive(Debug, Clone, Deserialize)]
pub struct NssfConfig {
    pub info: Info,
    pub configuration: Configuration,
    #[serde(default)]
    pub logger: Option<LoggerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Info {
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default)]
    pub nssf_name: Option<String>,
    #[serde(default)]
    pub sbi: SbiConfig,
    #[serde(default)]
    pub service_name_list: Vec<String>,
    #[serde(default)]
    pub nrf_uri: String,
    #[serde(default)]
    pub webui_uri: Option<String>,
    #[serde(default)]
    pub enable_streaming_config: bool,
    #[serde(default)]
    pub streaming_config_uri: Option<String>,
    /// Heartbeat interval offered to the NRF, in seconds
    #[serde(default)]
    pub heartbeat_timer: Option<u32>,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub supported_plmn_list: Vec<PlmnId>,
    #[serde(default)]
    pub supported_nssai_in_plmn_list: Vec<SupportedNssaiInPlmnConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SbiConfig {
    #[serde(default)]
    pub scheme: UriScheme,
    #[serde(rename = "registerIPv4", default)]
    pub register_ipv4: String,
    #[serde(rename = "bindingIPv4", default)]
    pub binding_ipv4: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub tls: Option<TlsConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    pub pem: String,
    pub key: String,
}

/// Poller intervals, in seconds
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingConfig {
    #[serde(default = "default_initial_interval")]
    pub initial_interval: u64,
    #[serde(default = "default_max_interval")]
    pub max_interval: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            initial_interval: default_initial_interval(),
            max_interval: default_max_interval(),
        }
    }
}

impl PollingConfig {
    pub fn initial(&self) -> Duration {
        Duration::from_secs(self.initial_interval)
    }

    pub fn max(&self) -> Duration {
        Duration::from_secs(self.max_interval)
    }
}

fn default_initial_interval() -> u64 {
    INITIAL_POLLING_INTERVAL.as_secs()
}

fn default_max_interval() -> u64 {
    POLLING_MAX_BACKOFF.as_secs()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedNssaiInPlmnConfig {
    pub plmn_id: PlmnId,
    #[serde(default)]
    pub supported_snssai_list: Vec<Snssai>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggerConfig {
    #[serde(default)]
    pub level: Option<String>,
}

impl NssfConfig {
    /// Read, parse and validate a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate a configuration document
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: NssfConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.info.version != NSSF_EXPECTED_CONFIG_VERSION {
            return Err(ConfigError::VersionMismatch {
                found: self.info.version.clone(),
                expected: NSSF_EXPECTED_CONFIG_VERSION,
            });
        }

        let cfg = &self.configuration;
        if cfg.nrf_uri.is_empty() {
            return Err(ConfigError::Invalid("nrfUri is required".into()));
        }
        if !cfg.enable_streaming_config
            && cfg.webui_uri.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Invalid(
                "webuiUri is required when streaming config is disabled".into(),
            ));
        }
        if cfg.polling.initial_interval == 0 || cfg.polling.max_interval < cfg.polling.initial_interval {
            return Err(ConfigError::Invalid(format!(
                "polling intervals must satisfy 0 < initialInterval({}) <= maxInterval({})",
                cfg.polling.initial_interval, cfg.polling.max_interval
            )));
        }

        let plmns: HashSet<&PlmnId> = cfg.supported_plmn_list.iter().collect();
        for entry in &cfg.supported_nssai_in_plmn_list {
            if !plmns.contains(&entry.plmn_id) {
                return Err(ConfigError::Invalid(format!(
                    "PLMN {} in supportedNssaiInPlmnList is not in supportedPlmnList",
                    entry.plmn_id
                )));
            }
        }
        Ok(())
    }

    /// Streaming endpoint, falling back to the default
    pub fn streaming_config_uri(&self) -> &str {
        self.configuration
            .streaming_config_uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
            .unwrap_or(DEFAULT_STREAMING_CONFIG_URI)
    }

    /// Slice configuration used to seed the store before ingestion starts
    pub fn initial_nssai_config(&self) -> NssaiConfig {
        let cfg = &self.configuration;

        let mut supported_plmn_list: Vec<PlmnId> = Vec::new();
        for plmn in &cfg.supported_plmn_list {
            if !supported_plmn_list.contains(plmn) {
                supported_plmn_list.push(plmn.clone());
            }
        }

        let mut supported_nssai_in_plmn = SupportedNssaiInPlmn::new();
        for entry in &cfg.supported_nssai_in_plmn_list {
            supported_nssai_in_plmn
                .entry(entry.plmn_id.clone())
                .or_default()
                .extend(entry.supported_snssai_list.iter().cloned());
        }

        NssaiConfig {
            supported_plmn_list,
            supported_nssai_in_plmn,
        }
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logger.as_ref().and_then(|l| l.level.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
info:
  version: 1.0.0
  description: NSSF initial local configuration
configuration:
  nssfName: NSSF
  sbi:
    scheme: https
    registerIPv4: 10.0.0.5
    bindingIPv4: 0.0.0.0
    port: 29531
    tls:
      pem: /etc/nssf/tls/nssf.pem
      key: /etc/nssf/tls/nssf.key
  serviceNameList:
    - nnssf-nsselection
    - nnssf-nssaiavailability
  nrfUri: http://nrf:29510
  webuiUri: http://webui:5001
  heartbeatTimer: 30
  polling:
    initialInterval: 2
    maxInterval: 16
  supportedPlmnList:
    - mcc: "208"
      mnc: "93"
    - mcc: "001"
      mnc: "01"
  supportedNssaiInPlmnList:
    - plmnId:
        mcc: "208"
        mnc: "93"
      supportedSnssaiList:
        - sst: 1
          sd: "010203"
        - sst: 1
    - plmnId:
        mcc: "208"
        mnc: "93"
      supportedSnssaiList:
        - sst: 2
logger:
  level: debug
"#;

    #[test]
    fn test_parse_full_config() {
        let config = NssfConfig::from_yaml_str(FULL).unwrap();
        let cfg = &config.configuration;

        assert_eq!(cfg.nssf_name.as_deref(), Some("NSSF"));
        assert_eq!(cfg.sbi.scheme, UriScheme::Https);
        assert_eq!(cfg.sbi.register_ipv4, "10.0.0.5");
        assert_eq!(cfg.sbi.port, 29531);
        assert_eq!(cfg.sbi.tls.as_ref().unwrap().key, "/etc/nssf/tls/nssf.key");
        assert_eq!(cfg.service_name_list.len(), 2);
        assert_eq!(cfg.heartbeat_timer, Some(30));
        assert_eq!(cfg.polling.initial(), Duration::from_secs(2));
        assert_eq!(cfg.polling.max(), Duration::from_secs(16));
        assert!(!cfg.enable_streaming_config);
        assert_eq!(config.log_level(), Some("debug"));
        assert_eq!(config.streaming_config_uri(), DEFAULT_STREAMING_CONFIG_URI);
    }

    #[test]
    fn test_initial_nssai_config_groups_entries() {
        let config = NssfConfig::from_yaml_str(FULL).unwrap();
        let initial = config.initial_nssai_config();
        let plmn = PlmnId::new("208", "93");

        assert_eq!(
            initial.supported_plmn_list,
            vec![plmn.clone(), PlmnId::new("001", "01")]
        );
        let slices = &initial.supported_nssai_in_plmn[&plmn];
        assert_eq!(slices.len(), 3);
        assert!(slices.contains(&Snssai::new(1, "")));
        assert!(slices.contains(&Snssai::new(2, "")));
        assert!(slices.contains(&Snssai::new(1, "010203")));
    }

    #[test]
    fn test_defaults() {
        let config = NssfConfig::from_yaml_str(
            "info:\n  version: 1.0.0\nconfiguration:\n  nrfUri: http://nrf:8000\n  webuiUri: http://webui:5001\n",
        )
        .unwrap();
        let cfg = &config.configuration;

        assert_eq!(cfg.sbi.scheme, UriScheme::Http);
        assert_eq!(cfg.polling.initial(), INITIAL_POLLING_INTERVAL);
        assert_eq!(cfg.polling.max(), POLLING_MAX_BACKOFF);
        assert!(cfg.heartbeat_timer.is_none());
        assert!(config.log_level().is_none());
        assert_eq!(config.initial_nssai_config(), NssaiConfig::default());
    }

    #[test]
    fn test_version_mismatch() {
        let err = NssfConfig::from_yaml_str(
            "info:\n  version: 2.0.0\nconfiguration:\n  nrfUri: http://nrf:8000\n  webuiUri: http://webui\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::VersionMismatch { .. }));
        assert_eq!(
            err.to_string(),
            "config version is [2.0.0], but expected is [1.0.0]"
        );
    }

    #[test]
    fn test_webui_required_in_polling_mode() {
        let polling = "info:\n  version: 1.0.0\nconfiguration:\n  nrfUri: http://nrf:8000\n";
        assert!(matches!(
            NssfConfig::from_yaml_str(polling),
            Err(ConfigError::Invalid(_))
        ));

        let streaming = "info:\n  version: 1.0.0\nconfiguration:\n  nrfUri: http://nrf:8000\n  enableStreamingConfig: true\n  streamingConfigUri: http://config:9876\n";
        let config = NssfConfig::from_yaml_str(streaming).unwrap();
        assert_eq!(config.streaming_config_uri(), "http://config:9876");
    }

    #[test]
    fn test_nrf_uri_required() {
        let yaml = "info:\n  version: 1.0.0\nconfiguration:\n  webuiUri: http://webui\n";
        assert!(matches!(
            NssfConfig::from_yaml_str(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_nssai_plmn_must_be_supported() {
        let yaml = r#"
info:
  version: 1.0.0
configuration:
  nrfUri: http://nrf:8000
  webuiUri: http://webui
  supportedPlmnList:
    - { mcc: "208", mnc: "93" }
  supportedNssaiInPlmnList:
    - plmnId: { mcc: "001", mnc: "01" }
      supportedSnssaiList: [{ sst: 1 }]
"#;
        let err = NssfConfig::from_yaml_str(yaml).unwrap_err();
        assert!(err.to_string().contains("001-01"));
    }

    #[test]
    fn test_invalid_polling_intervals() {
        let yaml = "info:\n  version: 1.0.0\nconfiguration:\n  nrfUri: http://nrf\n  webuiUri: http://webui\n  polling:\n    initialInterval: 10\n    maxInterval: 5\n";
        assert!(matches!(
            NssfConfig::from_yaml_str(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = NssfConfig::from_file("/nonexistent/nssf.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
