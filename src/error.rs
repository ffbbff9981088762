//! Normalized error model shared by every asynchronous operation of the client.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use serde_with::skip_serializing_none;
use thiserror::Error;

use crate::api::error::ClientError;

/// Closed set of failure categories surfaced to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    /// No response was received (refused connection, DNS failure, reset).
    Network,
    /// The request did not complete before the configured deadline.
    Timeout,
    /// The Trackline backend answered with a failure status.
    RemoteApi,
    /// A third-party service (Spotify) answered with a failure status.
    ExternalServiceApi,
    /// Anything the classifier does not recognise.
    Unexpected,
}

impl ErrorCode {
    /// Stable name used in logs and serialized payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Network => "Network",
            ErrorCode::Timeout => "Timeout",
            ErrorCode::RemoteApi => "RemoteApi",
            ErrorCode::ExternalServiceApi => "ExternalServiceApi",
            ErrorCode::Unexpected => "Unexpected",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured payload attached to API rejections.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorExtra {
    /// HTTP status returned by the remote service.
    pub status_code: Option<u16>,
    /// The `error` object of the response body, when the body was structured.
    pub api_error: Option<Value>,
}

impl ErrorExtra {
    fn into_option(self) -> Option<Self> {
        (self.status_code.is_some() || self.api_error.is_some()).then_some(self)
    }
}

/// Normalized representation of a failure observed at the async boundary.
///
/// Values are immutable once built. The constructors guarantee that `extra` is
/// only ever present for [`ErrorCode::RemoteApi`] and
/// [`ErrorCode::ExternalServiceApi`].
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{code}: {message}")]
pub struct AppError {
    code: ErrorCode,
    message: String,
    extra: Option<ErrorExtra>,
}

impl AppError {
    /// Failure where no response was received.
    pub fn network(message: impl Into<String>) -> Self {
        Self::bare(ErrorCode::Network, message)
    }

    /// Failure where the response did not arrive in time.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::bare(ErrorCode::Timeout, message)
    }

    /// Rejection returned by the Trackline backend.
    pub fn remote_api(
        message: impl Into<String>,
        status_code: Option<u16>,
        api_error: Option<Value>,
    ) -> Self {
        Self {
            code: ErrorCode::RemoteApi,
            message: message.into(),
            extra: ErrorExtra {
                status_code,
                api_error,
            }
            .into_option(),
        }
    }

    /// Rejection returned by an external service such as Spotify.
    pub fn external_service(
        message: impl Into<String>,
        status_code: Option<u16>,
        api_error: Option<Value>,
    ) -> Self {
        Self {
            code: ErrorCode::ExternalServiceApi,
            message: message.into(),
            extra: ErrorExtra {
                status_code,
                api_error,
            }
            .into_option(),
        }
    }

    /// Failure the classifier could not recognise.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::bare(ErrorCode::Unexpected, message)
    }

    fn bare(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            extra: None,
        }
    }

    /// Category of the failure.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable description. Never branch on it.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured payload for API rejections.
    pub fn extra(&self) -> Option<&ErrorExtra> {
        self.extra.as_ref()
    }

    /// HTTP status carried by an API rejection, if any.
    pub fn status_code(&self) -> Option<u16> {
        self.extra.as_ref().and_then(|extra| extra.status_code)
    }
}

/// Which remote service a [`ClientError`] originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiOrigin {
    /// The Trackline game backend.
    Trackline,
    /// The Spotify Web API.
    Spotify,
}

/// Every failure an operation body can return before normalization.
#[derive(Debug, Error)]
pub enum OperationError {
    /// Already normalized; copied through verbatim.
    #[error(transparent)]
    App(#[from] AppError),
    /// Failure talking to the Trackline backend.
    #[error("trackline api: {0}")]
    Trackline(#[source] ClientError),
    /// Failure talking to Spotify.
    #[error("spotify api: {0}")]
    Spotify(#[source] ClientError),
    /// Anything else.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ClientError> for OperationError {
    fn from(err: ClientError) -> Self {
        OperationError::Trackline(err)
    }
}

impl OperationError {
    /// Map the failure onto exactly one [`AppError`].
    pub fn classify(self) -> AppError {
        match self {
            OperationError::App(err) => err,
            OperationError::Trackline(err) => classify_client(err, ApiOrigin::Trackline),
            OperationError::Spotify(err) => classify_client(err, ApiOrigin::Spotify),
            OperationError::Other(err) => AppError::unexpected(format!("{err:#}")),
        }
    }
}

fn classify_client(err: ClientError, origin: ApiOrigin) -> AppError {
    let message = err.to_string();
    match err {
        ClientError::Transport { source, .. } | ClientError::Decode { source, .. }
            if source.is_timeout() =>
        {
            AppError::timeout(message)
        }
        ClientError::Transport { .. } => AppError::network(message),
        ClientError::Status { status, body, .. } => {
            let api_error = body.and_then(|mut body| body.get_mut("error").map(Value::take));
            match origin {
                ApiOrigin::Trackline => {
                    AppError::remote_api(message, Some(status.as_u16()), api_error)
                }
                ApiOrigin::Spotify => {
                    AppError::external_service(message, Some(status.as_u16()), api_error)
                }
            }
        }
        ClientError::Decode { .. } | ClientError::ClientBuilder { .. } => {
            AppError::unexpected(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;

    use super::*;

    fn status_error(status: StatusCode, body: Option<Value>) -> ClientError {
        ClientError::Status {
            path: "games/abc123".into(),
            status,
            body,
        }
    }

    #[test]
    fn app_errors_pass_through_verbatim() {
        let original = AppError::remote_api("gone", Some(410), Some(json!({ "code": "GONE" })));
        let classified = OperationError::App(original.clone()).classify();
        assert_eq!(classified, original);
    }

    #[test]
    fn trackline_rejection_carries_status_and_api_error() {
        let err = status_error(
            StatusCode::NOT_FOUND,
            Some(json!({ "error": { "code": "GAME_NOT_FOUND" } })),
        );
        let classified = OperationError::Trackline(err).classify();

        assert_eq!(classified.code(), ErrorCode::RemoteApi);
        assert_eq!(classified.status_code(), Some(404));
        assert_eq!(
            classified.extra().and_then(|extra| extra.api_error.clone()),
            Some(json!({ "code": "GAME_NOT_FOUND" }))
        );
    }

    #[test]
    fn unstructured_rejection_keeps_status_only() {
        let err = status_error(StatusCode::BAD_GATEWAY, Some(json!("upstream down")));
        let classified = OperationError::Trackline(err).classify();

        assert_eq!(classified.code(), ErrorCode::RemoteApi);
        assert_eq!(
            classified.extra(),
            Some(&ErrorExtra {
                status_code: Some(502),
                api_error: None,
            })
        );
    }

    #[test]
    fn spotify_rejection_is_external() {
        let err = status_error(
            StatusCode::UNAUTHORIZED,
            Some(json!({ "error": { "status": 401, "message": "The access token expired" } })),
        );
        let classified = OperationError::Spotify(err).classify();

        assert_eq!(classified.code(), ErrorCode::ExternalServiceApi);
        assert_eq!(classified.status_code(), Some(401));
    }

    #[test]
    fn other_failures_are_unexpected_without_extra() {
        let classified = OperationError::Other(anyhow::anyhow!("boom")).classify();
        assert_eq!(classified.code(), ErrorCode::Unexpected);
        assert!(classified.extra().is_none());
    }

    #[test]
    fn extra_is_dropped_when_empty() {
        let err = AppError::remote_api("rejected", None, None);
        assert!(err.extra().is_none());
    }

    #[test]
    fn serializes_with_camel_case_extra() {
        let err = AppError::remote_api(
            "rejected",
            Some(409),
            Some(json!({ "code": "TURN_ALREADY_STARTED" })),
        );
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(
            value,
            json!({
                "code": "RemoteApi",
                "message": "rejected",
                "extra": { "statusCode": 409, "apiError": { "code": "TURN_ALREADY_STARTED" } }
            })
        );

        let value = serde_json::to_value(AppError::network("offline")).unwrap();
        assert_eq!(value, json!({ "code": "Network", "message": "offline" }));
    }
}
