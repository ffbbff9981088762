//! Error types shared by the HTTP clients.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Convenient result alias returning [`ClientError`] failures.
pub type ApiResult<T> = Result<T, ClientError>;

/// Failures that can occur while talking to a remote HTTP API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build HTTP client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or no response arrived.
    #[error("request to `{path}` failed")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with a non-success status.
    #[error("`{path}` responded with status {status}")]
    Status {
        path: String,
        status: StatusCode,
        body: Option<Value>,
    },
    /// Response payload could not be decoded into the expected model.
    #[error("failed to decode response for `{path}`")]
    Decode {
        path: String,
        #[source]
        source: reqwest::Error,
    },
}
