//! Error types for the Mistral client.

use std::time::Duration;
use thiserror::Error;

/// Errors returned by every client operation.
#[derive(Debug, Error)]
pub enum Error {
    /// A required option was left empty. Raised before anything is sent.
    #[error("missing required option `{field}`")]
    Validation {
        /// Semantic name of the offending option field.
        field: &'static str,
    },

    /// The server answered with a status outside the operation's accepted set.
    #[error("{method} {url} returned status {status}: {body}")]
    Request {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    /// The request never produced an HTTP response (connect, TLS, timeout...).
    #[error("HTTP transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The response body did not have the expected shape.
    #[error("failed to decode response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        /// Raw body as received, kept for diagnostics.
        payload: String,
    },

    /// The polled resource reached a terminal failure state.
    #[error("{0}")]
    PollFailure(String),

    /// The polled condition did not complete before the deadline.
    #[error("condition not met after {elapsed:?}")]
    PollTimeout { elapsed: Duration },

    /// Invalid endpoint or pagination link.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// HTTP status carried by a [`Error::Request`], if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn decode(source: serde_json::Error, payload: &str) -> Self {
        Error::Decode {
            source,
            payload: payload.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(Box::new(err))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
