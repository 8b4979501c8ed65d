//! Transport layer
//!
//! The client talks to the service through the [`Transport`] trait, a minimal
//! GET/POST/DELETE capability that returns status and body without judging
//! them. [`ServiceClient`] adds the endpoint, default headers and per-operation
//! accepted status codes on top.
//!
//! # Module Structure
//!
//! - [`client`] - Service client holding endpoint, headers and transport handle
//! - [`http`] - `reqwest` implementation of [`Transport`]

pub mod client;
pub mod http;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use client::ServiceClient;
pub use http::HttpTransport;

/// Request headers as ordered name/value pairs.
pub type Headers = [(String, String)];

/// Status and body of an HTTP response, as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Payload of a POST request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    /// Raw text document, sent as `text/plain`.
    Text(String),
}

impl RequestBody {
    pub fn content_type(&self) -> &'static str {
        match self {
            RequestBody::Json(_) => "application/json",
            RequestBody::Text(_) => "text/plain",
        }
    }
}

/// Opaque HTTP capability used by every operation.
///
/// Implementations only fail for requests that produced no response at all;
/// any status code is returned as a [`RawResponse`]. Retry policy, if any,
/// belongs here and not in the callers.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, headers: &Headers) -> Result<RawResponse>;

    async fn post(&self, url: &str, body: RequestBody, headers: &Headers) -> Result<RawResponse>;

    async fn delete(&self, url: &str, headers: &Headers) -> Result<RawResponse>;
}
