//! SBI Error Types
//!
//! Error types for the SBI library

use thiserror::Error;

/// SBI Error type
#[derive(Error, Debug)]
pub enum SbiError {
    /// Connection could not be established or was dropped mid-exchange
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Invalid URI
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    /// Invalid method
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Request could not be built
    #[error("Client error: {0}")]
    ClientError(String),

    /// Response body could not be read
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl SbiError {
    /// True when no HTTP response was obtained at all
    pub fn is_transport(&self) -> bool {
        matches!(self, SbiError::ConnectionError(_) | SbiError::Timeout)
    }
}

/// Result type for SBI operations
pub type SbiResult<T> = Result<T, SbiError>;
