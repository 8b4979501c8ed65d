//! HTTP transport for Mistral REST API calls

use super::{Headers, RawResponse, RequestBody, Transport};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("mistral-client/", env!("CARGO_PKG_VERSION"));

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.chars().count() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control() && c != ' ', "")
}

/// `reqwest`-backed transport
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the default timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a transport with a custom per-request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }

    async fn send(
        &self,
        method: &str,
        url: &str,
        request: RequestBuilder,
        headers: &Headers,
    ) -> Result<RawResponse> {
        tracing::debug!("{} {}", method, url);

        let request = headers
            .iter()
            .fold(request, |req, (name, value)| req.header(name, value));

        let response: Response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::trace!("{} {} -> {} ({} bytes)", method, url, status, body.len());

        Ok(RawResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, headers: &Headers) -> Result<RawResponse> {
        self.send("GET", url, self.client.get(url), headers).await
    }

    async fn post(&self, url: &str, body: RequestBody, headers: &Headers) -> Result<RawResponse> {
        let request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, body.content_type());

        let request = match body {
            RequestBody::Json(value) => request.body(value.to_string()),
            RequestBody::Text(text) => request.body(text),
        };

        self.send("POST", url, request, headers).await
    }

    async fn delete(&self, url: &str, headers: &Headers) -> Result<RawResponse> {
        self.send("DELETE", url, self.client.delete(url), headers).await
    }
}

/// Format a client error for display
/// Maps common HTTP statuses to short, actionable messages
pub fn format_error(error: &Error) -> String {
    match error {
        Error::Request { status: 401, .. } => {
            "Authentication failed. Check the token passed with --token or OS_AUTH_TOKEN.".to_string()
        }
        Error::Request { status: 403, .. } => {
            "Permission denied for this workflow resource.".to_string()
        }
        Error::Request { status: 404, .. } => "Resource not found.".to_string(),
        Error::Request { status: 409, .. } => {
            "Resource conflict. The resource may already exist or be in use.".to_string()
        }
        Error::Request { status: 429, .. } => {
            "Rate limit exceeded. Please try again later.".to_string()
        }
        Error::Request { status, .. } if *status >= 500 => {
            "Workflow service temporarily unavailable. Please try again.".to_string()
        }
        Error::Request { status, body, .. } => {
            format!("Request failed ({}): {}", status, sanitize_for_log(body))
        }
        Error::Transport(_) => {
            "Request failed. Check your network connection and the service endpoint.".to_string()
        }
        other => other.to_string(),
    }
}
