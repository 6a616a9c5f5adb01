//! SBI Message Structures
//!
//! Request and response envelopes exchanged through [`crate::SbiClient`],
//! plus the RFC 7807 problem body returned by SBI producers on failure.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Content type used for JSON bodies
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// Content type used for JSON Patch bodies (RFC 6902)
pub const CONTENT_TYPE_JSON_PATCH: &str = "application/json-patch+json";
/// Content type used for problem details bodies
pub const CONTENT_TYPE_PROBLEM_JSON: &str = "application/problem+json";

/// SBI Header
#[derive(Debug, Clone, Default)]
pub struct SbiHeader {
    /// HTTP method (GET, PUT, DELETE, PATCH, ...)
    pub method: String,
    /// Absolute URI
    pub uri: String,
}

impl SbiHeader {
    /// Create a new header with method and URI
    pub fn with_method_uri(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
        }
    }
}

/// HTTP part of an SBI message. Header names are stored lowercased.
#[derive(Debug, Clone, Default)]
pub struct SbiHttpMessage {
    /// HTTP headers
    pub headers: HashMap<String, String>,
    /// Body content
    pub content: Option<String>,
}

impl SbiHttpMessage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers
            .insert(key.into().to_ascii_lowercase(), value.into());
    }

    /// Get a header (case-insensitive)
    pub fn get_header(&self, key: &str) -> Option<&String> {
        self.headers.get(&key.to_ascii_lowercase())
    }

    /// Set the body content
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = Some(content.into());
    }
}

/// SBI Request
#[derive(Debug, Clone, Default)]
pub struct SbiRequest {
    /// Request header
    pub header: SbiHeader,
    /// HTTP message (headers, body)
    pub http: SbiHttpMessage,
}

impl SbiRequest {
    fn with_method(method: &str, uri: impl Into<String>) -> Self {
        Self {
            header: SbiHeader::with_method_uri(method, uri),
            http: SbiHttpMessage::new(),
        }
    }

    /// Create a GET request
    pub fn get(uri: impl Into<String>) -> Self {
        Self::with_method("GET", uri)
    }

    /// Create a PUT request
    pub fn put(uri: impl Into<String>) -> Self {
        Self::with_method("PUT", uri)
    }

    /// Create a PATCH request
    pub fn patch(uri: impl Into<String>) -> Self {
        Self::with_method("PATCH", uri)
    }

    /// Create a DELETE request
    pub fn delete(uri: impl Into<String>) -> Self {
        Self::with_method("DELETE", uri)
    }

    /// Set JSON body content
    pub fn with_json_body<T: Serialize>(self, body: &T) -> Result<Self, serde_json::Error> {
        self.with_json_body_as(body, CONTENT_TYPE_JSON)
    }

    /// Set a JSON-encoded body under an explicit content type
    pub fn with_json_body_as<T: Serialize>(
        mut self,
        body: &T,
        content_type: &str,
    ) -> Result<Self, serde_json::Error> {
        let json = serde_json::to_string(body)?;
        self.http.set_content(json);
        self.http.set_header("Content-Type", content_type);
        Ok(self)
    }

    /// Add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http.set_header(key, value);
        self
    }
}

/// SBI Response
#[derive(Debug, Clone, Default)]
pub struct SbiResponse {
    /// HTTP status code
    pub status: u16,
    /// HTTP message (headers, body)
    pub http: SbiHttpMessage,
}

impl SbiResponse {
    /// Create a response with status code
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// Set raw body content
    pub fn with_body(mut self, content: impl Into<String>, content_type: impl Into<String>) -> Self {
        self.http.set_content(content);
        self.http.set_header("Content-Type", content_type);
        self
    }

    /// Add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http.set_header(key, value);
        self
    }

    /// Content-Type header, if any
    pub fn content_type(&self) -> Option<&str> {
        self.http.get_header("content-type").map(String::as_str)
    }

    /// Location header, if any
    pub fn location(&self) -> Option<&str> {
        self.http.get_header("location").map(String::as_str)
    }

    /// True when the body is declared as JSON (including `+json` suffixes)
    pub fn has_json_body(&self) -> bool {
        self.content_type()
            .map(|ct| ct.contains(CONTENT_TYPE_JSON) || ct.contains("+json"))
            .unwrap_or(false)
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse JSON body
    pub fn json_body<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        let content = self.http.content.as_deref().unwrap_or("{}");
        serde_json::from_str(content)
    }

    /// Parse a problem details body, filling `status` from the response when absent
    pub fn problem_details(&self) -> Option<ProblemDetails> {
        let content = self.http.content.as_deref()?;
        let mut problem: ProblemDetails = serde_json::from_str(content).ok()?;
        if problem.status.is_none() {
            problem.status = Some(self.status as i32);
        }
        Some(problem)
    }
}

/// Problem Details - RFC 7807 compliant error response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// A URI reference that identifies the problem type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<String>,
    /// A short, human-readable summary of the problem type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The HTTP status code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    /// A human-readable explanation specific to this occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Application-specific error cause
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ProblemDetails {
    pub fn with_status(status: i32) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
