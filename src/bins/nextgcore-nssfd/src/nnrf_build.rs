//! NSSF NRF Message Builders
//!
//! NF profile and heartbeat patch documents sent to the NRF

use ogs_sbi::{
    IpEndPoint, NfProfile, NfService, NfServiceVersion, NfStatus, NfType, PatchItem, PlmnId,
    TransportProtocol, UriScheme,
};
use serde_json::json;

use crate::context::NssfContext;

/// API version advertised for every NSSF service
const NSSF_API_VERSION_IN_URI: &str = "v1";
const NSSF_API_FULL_VERSION: &str = "1.0.0";

/// One advertised service per configured service name
pub fn nssf_nnrf_build_nf_services(
    service_names: &[String],
    scheme: UriScheme,
    register_ipv4: &str,
    port: u16,
) -> Vec<NfService> {
    service_names
        .iter()
        .enumerate()
        .map(|(index, name)| NfService {
            service_instance_id: index.to_string(),
            service_name: name.clone(),
            versions: vec![NfServiceVersion {
                api_version_in_uri: NSSF_API_VERSION_IN_URI.to_string(),
                api_full_version: NSSF_API_FULL_VERSION.to_string(),
            }],
            scheme,
            nf_service_status: NfStatus::Registered,
            ip_end_points: Some(vec![IpEndPoint {
                ipv4_address: Some(register_ipv4.to_string()),
                transport: Some(TransportProtocol::Tcp),
                port: Some(port),
            }]),
        })
        .collect()
}

/// Build a fresh NF profile from the context and the current PLMN list
pub fn nssf_nnrf_build_nf_profile(ctx: &NssfContext, plmn_list: Vec<PlmnId>) -> NfProfile {
    let mut profile = NfProfile::new(ctx.nf_id.clone(), NfType::Nssf);

    profile.heart_beat_timer = ctx.heartbeat_timer;
    if !plmn_list.is_empty() {
        profile.plmn_list = Some(plmn_list);
    }
    profile.ipv4_addresses = vec![ctx.register_ipv4.clone()];
    if !ctx.nf_services.is_empty() {
        profile.nf_services = Some(ctx.nf_services.clone());
    }

    profile
}

/// `[{op: replace, path: /nfStatus, value: REGISTERED}]`
pub fn nssf_nnrf_build_heartbeat_patch() -> Vec<PatchItem> {
    vec![PatchItem::replace("/nfStatus", json!("REGISTERED"))]
}
