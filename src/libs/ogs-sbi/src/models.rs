//! OpenAPI models for the Nnrf_NFManagement service
//!
//! Only the subset of TS 29.510 an NF needs to register, heartbeat and
//! deregister itself. Field names follow the OpenAPI camelCase JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

/// PLMN ID (Public Land Mobile Network Identity)
///
/// MCC and MNC are kept as the decimal digit strings used on the wire
/// ("208", "93"), so two-digit and three-digit MNCs stay distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlmnId {
    /// Mobile Country Code
    pub mcc: String,
    /// Mobile Network Code
    pub mnc: String,
}

impl PlmnId {
    pub fn new(mcc: impl Into<String>, mnc: impl Into<String>) -> Self {
        Self {
            mcc: mcc.into(),
            mnc: mnc.into(),
        }
    }
}

impl fmt::Display for PlmnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.mcc, self.mnc)
    }
}

/// S-NSSAI (Single Network Slice Selection Assistance Information)
///
/// An absent slice differentiator is represented by the empty string so
/// that `{sst: 1}` and `{sst: 1, sd: ""}` compare and hash equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Snssai {
    /// Slice/Service Type
    pub sst: u8,
    /// Slice Differentiator, 6 hex digits or empty
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sd: String,
}

impl Snssai {
    pub fn new(sst: u8, sd: impl Into<String>) -> Self {
        Self { sst, sd: sd.into() }
    }

    /// Build from a wire representation where the SD may be absent
    pub fn from_optional_sd(sst: u8, sd: Option<String>) -> Self {
        Self {
            sst,
            sd: sd.unwrap_or_default(),
        }
    }

    /// Standardized SST values (TS 23.501 5.15.2.2) without an SD
    pub fn is_standard(&self) -> bool {
        self.sd.is_empty() && (1..=3).contains(&self.sst)
    }
}

impl fmt::Display for Snssai {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sd.is_empty() {
            write!(f, "sst:{}", self.sst)
        } else {
            write!(f, "sst:{} sd:{}", self.sst, self.sd)
        }
    }
}

/// NF Type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NfType {
    Nrf,
    Udm,
    Amf,
    Smf,
    Ausf,
    Nef,
    Pcf,
    Nssf,
    Udr,
    Upf,
    Scp,
}

impl NfType {
    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Nrf => "NRF",
            Self::Udm => "UDM",
            Self::Amf => "AMF",
            Self::Smf => "SMF",
            Self::Ausf => "AUSF",
            Self::Nef => "NEF",
            Self::Pcf => "PCF",
            Self::Nssf => "NSSF",
            Self::Udr => "UDR",
            Self::Upf => "UPF",
            Self::Scp => "SCP",
        }
    }
}

impl fmt::Display for NfType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

/// NF Status, used for both NF profiles and NF services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NfStatus {
    Registered,
    Suspended,
    Undiscoverable,
}

/// URI scheme of an SBI endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UriScheme {
    #[default]
    Http,
    Https,
}

impl UriScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for UriScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport protocol of an IP endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportProtocol {
    Tcp,
}

/// API version advertised by an NF service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfServiceVersion {
    pub api_version_in_uri: String,
    pub api_full_version: String,
}

/// IP endpoint of an NF service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpEndPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<TransportProtocol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// NF Service advertised inside an NF profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfService {
    pub service_instance_id: String,
    pub service_name: String,
    pub versions: Vec<NfServiceVersion>,
    pub scheme: UriScheme,
    pub nf_service_status: NfStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_end_points: Option<Vec<IpEndPoint>>,
}

/// NF Profile as registered with the NRF
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NfProfile {
    pub nf_instance_id: String,
    pub nf_type: NfType,
    pub nf_status: NfStatus,
    /// Heartbeat interval in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_beat_timer: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plmn_list: Option<Vec<PlmnId>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ipv4_addresses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nf_services: Option<Vec<NfService>>,
}

impl NfProfile {
    pub fn new(nf_instance_id: impl Into<String>, nf_type: NfType) -> Self {
        Self {
            nf_instance_id: nf_instance_id.into(),
            nf_type,
            nf_status: NfStatus::Registered,
            heart_beat_timer: None,
            plmn_list: None,
            ipv4_addresses: Vec::new(),
            nf_services: None,
        }
    }

    /// Heartbeat interval, treating zero as unset
    pub fn heartbeat_interval(&self) -> Option<u32> {
        self.heart_beat_timer.filter(|secs| *secs > 0)
    }
}

/// JSON Patch operation (RFC 6902)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOperation {
    Add,
    Remove,
    Replace,
}

/// One JSON Patch item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchItem {
    pub op: PatchOperation,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl PatchItem {
    /// `replace` operation on `path`
    pub fn replace(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            op: PatchOperation::Replace,
            path: path.into(),
            value: Some(value),
        }
    }
}
