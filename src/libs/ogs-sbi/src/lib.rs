//! NextGCore SBI (Service Based Interface) Library
//!
//! This crate provides the HTTP client side of the 3GPP Service Based
//! Interface for 5G core network functions, built on hyper.
//!
//! # Example
//!
//! ```rust,no_run
//! use ogs_sbi::{SbiClient, SbiClientConfig};
//!
//! async fn example() {
//!     let client = SbiClient::new(SbiClientConfig::default());
//!     let response = client.get("http://nrf:8000/nnrf-nfm/v1/nf-instances").await;
//! }
//! ```
//!
//! # Modules
//!
//! - [`models`] - Nnrf_NFManagement OpenAPI models (NF profile, PLMN, S-NSSAI)
//! - [`message`] - SBI message structures (request, response, problem details)
//! - [`client`] - HTTP client implementation
//! - [`error`] - Error types

pub mod error;
pub mod message;
pub mod models;

pub mod client;

// Re-export commonly used types
pub use client::{SbiClient, SbiClientConfig};
pub use error::{SbiError, SbiResult};
pub use message::{
    ProblemDetails, SbiHeader, SbiHttpMessage, SbiRequest, SbiResponse, CONTENT_TYPE_JSON,
    CONTENT_TYPE_JSON_PATCH, CONTENT_TYPE_PROBLEM_JSON,
};
pub use models::{
    IpEndPoint, NfProfile, NfService, NfServiceVersion, NfStatus, NfType, PatchItem,
    PatchOperation, PlmnId, Snssai, TransportProtocol, UriScheme,
};
