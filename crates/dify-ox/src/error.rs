use serde::Deserialize;
use thiserror::Error;

/// Categorizes errors so callers can decide whether to reissue a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Precondition violated before any I/O - never retry
    Caller,
    /// Authentication/authorization issues - should not retry
    Auth,
    /// Rate limiting - may retry with backoff
    RateLimit,
    /// Network/connection issues, including streams dropped mid-way - may retry
    Network,
    /// Server-side failure - may retry
    Server,
    /// The server spoke a protocol we could not follow
    Protocol,
    /// Unknown/other errors
    Other,
}

/// Failure to turn one SSE record into a typed event.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("record is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("record payload is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("record payload is not a JSON object")]
    NotAnObject,

    #[error("record has no `event` tag")]
    MissingTag,

    #[error("unknown event tag: {0}")]
    UnknownTag(String),

    #[error("invalid payload for `{tag}` event: {source}")]
    InvalidPayload {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Error body returned by the Dify API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
}

#[derive(Debug, Error)]
pub enum DifyRequestError {
    /// A request precondition failed; no I/O was performed
    #[error("Invalid request: {0}")]
    Caller(String),

    /// No usable credential for the call
    #[error("Authentication missing: no API key provided")]
    AuthenticationMissing,

    /// Errors from the HTTP client
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    /// Non-2xx response from the API
    #[error("API error (HTTP {status}, {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// A streamed record could not be decoded
    #[error("Invalid event data: {0}")]
    Decode(#[from] DecodeError),

    /// The stream ended in the middle of a record
    #[error("Stream truncated mid-record: {0:?}")]
    TruncatedRecord(String),

    /// The stream ended on a record boundary without a terminal event
    #[error("Stream closed before a terminal event was received")]
    StreamClosed,

    /// Unexpected response from the API
    #[error("Unexpected response from API: {0}")]
    UnexpectedResponse(String),
}

impl DifyRequestError {
    /// Returns the error kind for categorizing errors
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Caller(_) => ErrorKind::Caller,
            Self::AuthenticationMissing => ErrorKind::Auth,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorKind::Auth,
                429 => ErrorKind::RateLimit,
                500..=599 => ErrorKind::Server,
                _ => ErrorKind::Other,
            },
            Self::ReqwestError(e) => {
                if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
                    ErrorKind::Network
                } else {
                    ErrorKind::Other
                }
            }
            Self::TruncatedRecord(_) | Self::StreamClosed => ErrorKind::Network,
            Self::Decode(_) | Self::UnexpectedResponse(_) => ErrorKind::Protocol,
            Self::SerdeError(_) => ErrorKind::Other,
        }
    }

    /// Returns true if reissuing the whole request may succeed.
    /// The client itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RateLimit | ErrorKind::Network | ErrorKind::Server
        )
    }

    pub(crate) fn caller(message: impl Into<String>) -> Self {
        Self::Caller(message.into())
    }
}

/// Parse an error response from the Dify API.
/// Handles the JSON `{code, message, status}` shape and falls back to plain text.
pub fn parse_error_response(status: reqwest::StatusCode, bytes: &bytes::Bytes) -> DifyRequestError {
    let status_code = status.as_u16();

    if let Ok(payload) = serde_json::from_slice::<ApiErrorResponse>(bytes) {
        if payload.code.is_some() || payload.message.is_some() {
            return DifyRequestError::Api {
                status: payload.status.unwrap_or(status_code),
                code: payload.code.unwrap_or_else(|| default_code(status_code).to_string()),
                message: payload.message.unwrap_or_default(),
            };
        }
    }

    DifyRequestError::Api {
        status: status_code,
        code: default_code(status_code).to_string(),
        message: String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn default_code(status: u16) -> &'static str {
    match status {
        400 => "bad_request",
        401 => "unauthorized",
        403 => "forbidden",
        404 => "not_found",
        429 => "too_many_requests",
        500..=599 => "internal_server_error",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn parses_dify_error_body() {
        let body = bytes::Bytes::from_static(
            br#"{"code":"unauthorized","message":"Access token is invalid","status":401}"#,
        );
        let err = parse_error_response(StatusCode::UNAUTHORIZED, &body);
        match err {
            DifyRequestError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 401);
                assert_eq!(code, "unauthorized");
                assert_eq!(message, "Access token is invalid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_raw_text() {
        let body = bytes::Bytes::from_static(b"Bad Gateway");
        let err = parse_error_response(StatusCode::BAD_GATEWAY, &body);
        assert!(matches!(
            &err,
            DifyRequestError::Api { status: 502, code, message }
                if code == "internal_server_error" && message == "Bad Gateway"
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn caller_errors_are_not_retryable() {
        let err = DifyRequestError::caller("query and inputs are both empty");
        assert_eq!(err.kind(), ErrorKind::Caller);
        assert!(!err.is_retryable());
        assert_eq!(DifyRequestError::AuthenticationMissing.kind(), ErrorKind::Auth);
    }

    #[test]
    fn truncation_is_distinct_from_clean_close() {
        let truncated = DifyRequestError::TruncatedRecord("data: {\"ev".to_string());
        assert!(matches!(truncated, DifyRequestError::TruncatedRecord(_)));
        assert_eq!(truncated.kind(), ErrorKind::Network);
        assert_eq!(DifyRequestError::StreamClosed.kind(), ErrorKind::Network);
    }
}
