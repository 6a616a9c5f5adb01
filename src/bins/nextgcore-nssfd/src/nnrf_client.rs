//! NSSF NRF Client
//!
//! Nnrf_NFManagement register / update / deregister. Each call is a single
//! attempt; outcomes are typed so the lifecycle state machine decides what
//! to retry.

use async_trait::async_trait;
use ogs_sbi::{
    NfProfile, PatchItem, ProblemDetails, SbiClient, SbiClientConfig, SbiError, SbiRequest,
    SbiResponse, CONTENT_TYPE_JSON_PATCH,
};
use thiserror::Error;

use crate::context::nf_instance_uri;

/// Path marker separating the NRF base URI from the resource path
pub const NNRF_NFM_PATH_MARKER: &str = "/nnrf-nfm/";

#[derive(Debug, Error)]
pub enum NrfFailure {
    #[error("transport failure: {0}")]
    Transport(#[from] SbiError),

    #[error("unexpected status code: {0}")]
    UnexpectedStatus(u16),

    #[error("malformed response: {0}")]
    MalformedBody(String),
}

/// NF instance resource returned in a 201 `Location` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NfInstanceLocation {
    /// NRF base URI to use for subsequent calls
    pub nrf_uri: String,
    /// NRF-assigned NF instance id
    pub nf_instance_id: String,
}

/// Split `<base>/nnrf-nfm/v1/nf-instances/<id>` into base and id
pub fn parse_location(location: &str) -> Option<NfInstanceLocation> {
    let base_end = location.find(NNRF_NFM_PATH_MARKER)?;
    let id_start = location.rfind('/')? + 1;
    let nf_instance_id = &location[id_start..];
    if nf_instance_id.is_empty() {
        return None;
    }
    Some(NfInstanceLocation {
        nrf_uri: location[..base_end].to_string(),
        nf_instance_id: nf_instance_id.to_string(),
    })
}

#[derive(Debug)]
pub enum RegisterOutcome {
    /// 201: new record; the NRF may have assigned a new id and base URI
    Created {
        profile: Option<NfProfile>,
        location: NfInstanceLocation,
    },
    /// 200: existing record replaced
    Updated { profile: Option<NfProfile> },
    Failed(NrfFailure),
}

impl RegisterOutcome {
    /// Profile echoed back by the NRF, if any
    pub fn profile(&self) -> Option<&NfProfile> {
        match self {
            RegisterOutcome::Created { profile, .. } | RegisterOutcome::Updated { profile } => {
                profile.as_ref()
            }
            RegisterOutcome::Failed(_) => None,
        }
    }
}

#[derive(Debug)]
pub enum UpdateOutcome {
    /// 200 (with profile) or 204
    Success(Option<NfProfile>),
    /// Error status with a problem details body
    Rejected(ProblemDetails),
    Failed(NrfFailure),
}

#[derive(Debug)]
pub enum DeregisterOutcome {
    Success,
    Failed(NrfFailure),
}

/// Registry operations used by the lifecycle coordinator
#[async_trait]
pub trait NrfClient: Send + Sync + 'static {
    async fn register(&self, nrf_uri: &str, nf_instance_id: &str, profile: &NfProfile) -> RegisterOutcome;

    async fn update(&self, nrf_uri: &str, nf_instance_id: &str, patch: &[PatchItem]) -> UpdateOutcome;

    async fn deregister(&self, nrf_uri: &str, nf_instance_id: &str) -> DeregisterOutcome;
}

/// SBI implementation of [`NrfClient`]
#[derive(Clone)]
pub struct SbiNrfClient {
    client: SbiClient,
}

impl SbiNrfClient {
    pub fn new(config: SbiClientConfig) -> Self {
        Self {
            client: SbiClient::new(config),
        }
    }
}

fn echoed_profile(response: &SbiResponse) -> Option<NfProfile> {
    response.http.content.as_ref()?;
    match response.json_body::<NfProfile>() {
        Ok(profile) => Some(profile),
        Err(e) => {
            log::warn!("[nrf] Ignoring unparsable NF profile in response: {e}");
            None
        }
    }
}

#[async_trait]
impl NrfClient for SbiNrfClient {
    async fn register(&self, nrf_uri: &str, nf_instance_id: &str, profile: &NfProfile) -> RegisterOutcome {
        let uri = nf_instance_uri(nrf_uri, nf_instance_id);
        let response = match self.client.put_json(&uri, profile).await {
            Ok(response) => response,
            Err(e) => return RegisterOutcome::Failed(e.into()),
        };

        match response.status {
            200 => RegisterOutcome::Updated {
                profile: echoed_profile(&response),
            },
            201 => {
                let Some(location) = response.location() else {
                    return RegisterOutcome::Failed(NrfFailure::MalformedBody(
                        "201 without Location header".into(),
                    ));
                };
                let Some(location) = parse_location(location) else {
                    return RegisterOutcome::Failed(NrfFailure::MalformedBody(format!(
                        "unexpected Location header {location:?}"
                    )));
                };
                RegisterOutcome::Created {
                    profile: echoed_profile(&response),
                    location,
                }
            }
            status => RegisterOutcome::Failed(NrfFailure::UnexpectedStatus(status)),
        }
    }

    async fn update(&self, nrf_uri: &str, nf_instance_id: &str, patch: &[PatchItem]) -> UpdateOutcome {
        let uri = nf_instance_uri(nrf_uri, nf_instance_id);
        let request = match SbiRequest::patch(uri).with_json_body_as(&patch, CONTENT_TYPE_JSON_PATCH) {
            Ok(request) => request,
            Err(e) => return UpdateOutcome::Failed(NrfFailure::MalformedBody(e.to_string())),
        };
        let response = match self.client.send_request(request).await {
            Ok(response) => response,
            Err(e) => return UpdateOutcome::Failed(e.into()),
        };

        match response.status {
            200 => UpdateOutcome::Success(echoed_profile(&response)),
            204 => UpdateOutcome::Success(None),
            status => match response.problem_details() {
                Some(problem) => UpdateOutcome::Rejected(problem),
                None => UpdateOutcome::Failed(NrfFailure::UnexpectedStatus(status)),
            },
        }
    }

    async fn deregister(&self, nrf_uri: &str, nf_instance_id: &str) -> DeregisterOutcome {
        let uri = nf_instance_uri(nrf_uri, nf_instance_id);
        match self.client.delete(&uri).await {
            Ok(response) if response.status == 204 => DeregisterOutcome::Success,
            Ok(response) => DeregisterOutcome::Failed(NrfFailure::UnexpectedStatus(response.status)),
            Err(e) => DeregisterOutcome::Failed(e.into()),
        }
    }
}
