//! Service Client
//!
//! Binds a transport to a service endpoint, adds default headers, and turns
//! responses outside an operation's accepted status set into errors.

use super::http::{sanitize_for_log, HttpTransport};
use super::{RawResponse, RequestBody, Transport};
use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Header carrying the auth token
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Client for one workflow service endpoint
#[derive(Clone)]
pub struct ServiceClient {
    endpoint: Url,
    transport: Arc<dyn Transport>,
    headers: Vec<(String, String)>,
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Header values may hold the token
        f.debug_struct("ServiceClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("headers", &self.headers.len())
            .finish()
    }
}

impl ServiceClient {
    /// Create a client using the default HTTP transport
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_transport(endpoint, Arc::new(HttpTransport::new()?))
    }

    /// Create a client on top of a custom transport
    pub fn with_transport(endpoint: &str, transport: Arc<dyn Transport>) -> Result<Self> {
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(Error::InvalidUrl(format!(
                "endpoint must start with http:// or https://, got: {}",
                endpoint
            )));
        }

        // A trailing slash makes relative links resolve beneath the endpoint
        let normalized = format!("{}/", endpoint.trim_end_matches('/'));
        let endpoint = Url::parse(&normalized)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", endpoint, e)))?;

        Ok(Self {
            endpoint,
            transport,
            headers: Vec::new(),
        })
    }

    /// Send `X-Auth-Token` with every request
    #[must_use]
    pub fn with_token(self, token: impl Into<String>) -> Self {
        self.with_header(AUTH_TOKEN_HEADER, token)
    }

    /// Send an extra header with every request
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Endpoint without the trailing slash
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str().trim_end_matches('/')
    }

    /// Build `<endpoint>/<part>/<part>...` with each part percent-encoded
    pub fn service_url(&self, parts: &[&str]) -> String {
        let path = parts
            .iter()
            .map(|p| urlencoding::encode(p).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}/{}", self.endpoint(), path)
    }

    /// Resolve a link from a response body against the endpoint
    pub(crate) fn resolve(&self, link: &str) -> Result<String> {
        match Url::parse(link) {
            Ok(url) => Ok(url.into()),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .endpoint
                .join(link)
                .map(String::from)
                .map_err(|e| Error::InvalidUrl(format!("{}: {}", link, e))),
            Err(e) => Err(Error::InvalidUrl(format!("{}: {}", link, e))),
        }
    }

    /// GET `url`, returning the body when the status is in `ok`
    pub async fn get(&self, url: &str, ok: &[u16]) -> Result<String> {
        let response = self.transport.get(url, &self.headers).await?;
        check("GET", url, response, ok)
    }

    /// POST `body` to `url`, returning the response body when the status is in `ok`
    pub async fn post(&self, url: &str, body: RequestBody, ok: &[u16]) -> Result<String> {
        let response = self.transport.post(url, body, &self.headers).await?;
        check("POST", url, response, ok)
    }

    /// DELETE `url`; any body on an accepted status is ignored
    pub async fn delete(&self, url: &str, ok: &[u16]) -> Result<()> {
        let response = self.transport.delete(url, &self.headers).await?;
        check("DELETE", url, response, ok).map(drop)
    }
}

fn check(method: &'static str, url: &str, response: RawResponse, ok: &[u16]) -> Result<String> {
    if ok.contains(&response.status) {
        return Ok(response.body);
    }

    // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
    tracing::error!(
        "API error: {} {} -> {} - {}",
        method,
        url,
        response.status,
        sanitize_for_log(&response.body)
    );

    Err(Error::Request {
        method,
        url: url.to_string(),
        status: response.status,
        body: response.body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> ServiceClient {
        ServiceClient::new(endpoint).unwrap()
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        assert!(matches!(
            ServiceClient::new("localhost:8989"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_service_url_building() {
        let c = client("http://localhost:8989/v2");
        assert_eq!(c.service_url(&["workflows"]), "http://localhost:8989/v2/workflows");
        assert_eq!(
            c.service_url(&["executions", "a b/c"]),
            "http://localhost:8989/v2/executions/a%20b%2Fc"
        );
    }

    #[test]
    fn test_service_url_with_trailing_slash() {
        let c = client("http://localhost:8989/v2/");
        assert_eq!(c.endpoint(), "http://localhost:8989/v2");
        assert_eq!(
            c.service_url(&["cron_triggers", "1"]),
            "http://localhost:8989/v2/cron_triggers/1"
        );
    }

    #[test]
    fn test_resolve_absolute_and_relative_links() {
        let c = client("http://localhost:8989/v2");
        assert_eq!(
            c.resolve("http://other:1/v2/workflows?marker=1").unwrap(),
            "http://other:1/v2/workflows?marker=1"
        );
        assert_eq!(
            c.resolve("workflows?marker=1").unwrap(),
            "http://localhost:8989/v2/workflows?marker=1"
        );
        assert_eq!(
            c.resolve("/v2/executions?marker=2").unwrap(),
            "http://localhost:8989/v2/executions?marker=2"
        );
    }

    #[test]
    fn test_check_status_sets() {
        let ok = check("GET", "u", RawResponse::new(200, "{}"), &[200]).unwrap();
        assert_eq!(ok, "{}");

        let err = check("DELETE", "u", RawResponse::new(500, "boom"), &[202, 204]).unwrap_err();
        match err {
            Error::Request { method, status, body, .. } => {
                assert_eq!(method, "DELETE");
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_debug_hides_header_values() {
        let c = client("http://localhost:8989/v2").with_token("secret");
        assert!(!format!("{c:?}").contains("secret"));
    }
}
