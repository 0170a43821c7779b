//! Error types and status classification for the Splitwise client.
//!
//! # Design
//! The service has no uniform error envelope, so classification is driven
//! by the status code alone. Four codes get semantic variants; any other
//! failing status keeps its decoded body in `Unclassified` so callers can
//! inspect whatever the service sent back.

use serde_json::Value;
use tracing::warn;

use crate::http::HttpResponse;

/// Errors returned by every client operation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 401: the credential was rejected.
    #[error("invalid token")]
    InvalidToken,

    /// 403: the credential may not perform this action.
    #[error("invalid API request: you do not have permission to perform that action")]
    PermissionDenied,

    /// 404: the addressed record does not exist.
    #[error("invalid API request: record not found")]
    RecordNotFound,

    /// 500 from the service.
    #[error("splitwise internal server error")]
    ServerError,

    /// Any other failing status, with the decoded response body.
    #[error("unknown API status code: {status} - payload: {payload}")]
    Unclassified { status: u16, payload: Value },

    /// The service answered 200 but reported errors in the body.
    #[error("request rejected by the service: {0}")]
    Rejected(Value),

    /// A response body could not be decoded.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// A request body could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The auth provider could not produce a credential.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A share in a by-share expense is malformed.
    #[error("invalid share at index {index}: {reason}")]
    InvalidShare { index: usize, reason: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call's deadline passed before a response arrived.
    #[error("request timed out")]
    Timeout,

    /// The caller cancelled the call.
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    /// True for the four status codes with a dedicated variant.
    pub fn is_classified(&self) -> bool {
        matches!(
            self,
            ApiError::InvalidToken
                | ApiError::PermissionDenied
                | ApiError::RecordNotFound
                | ApiError::ServerError
        )
    }

    /// Status code carried by the error, when it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::InvalidToken => Some(401),
            ApiError::PermissionDenied => Some(403),
            ApiError::RecordNotFound => Some(404),
            ApiError::ServerError => Some(500),
            ApiError::Unclassified { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Map a response status to `Ok(())` or the matching `ApiError`.
///
/// Statuses 100..=399 pass. For unmapped failing statuses the body is
/// decoded as arbitrary JSON; an undecodable body yields `Deserialization`.
pub fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    match response.status {
        100..=399 => Ok(()),
        401 => Err(ApiError::InvalidToken),
        403 => Err(ApiError::PermissionDenied),
        404 => Err(ApiError::RecordNotFound),
        500 => Err(ApiError::ServerError),
        status => {
            let payload: Value = serde_json::from_str(&response.body).map_err(|e| {
                ApiError::Deserialization(format!("status {status} with undecodable body: {e}"))
            })?;
            warn!(status, %payload, "unclassified response status");
            Err(ApiError::Unclassified { status, payload })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn informational_success_and_redirect_pass() {
        for status in [100, 200, 201, 204, 301, 399] {
            assert!(check_status(&HttpResponse::new(status, "")).is_ok(), "{status}");
        }
    }

    #[test]
    fn mapped_statuses_ignore_body() {
        let err = check_status(&HttpResponse::new(401, "not json at all")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken));
        let err = check_status(&HttpResponse::new(403, "")).unwrap_err();
        assert!(matches!(err, ApiError::PermissionDenied));
        let err = check_status(&HttpResponse::new(404, "{}")).unwrap_err();
        assert!(matches!(err, ApiError::RecordNotFound));
        let err = check_status(&HttpResponse::new(500, "<html>")).unwrap_err();
        assert!(matches!(err, ApiError::ServerError));
    }

    #[test]
    fn unmapped_status_carries_decoded_body() {
        let err = check_status(&HttpResponse::new(777, r#"{"error":"odd"}"#)).unwrap_err();
        match err {
            ApiError::Unclassified { status, payload } => {
                assert_eq!(status, 777);
                assert_eq!(payload, json!({"error": "odd"}));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unmapped_status_with_malformed_body_is_a_decode_error() {
        let err = check_status(&HttpResponse::new(422, "{broken")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
        assert!(!err.is_classified());
    }

    #[test]
    fn status_accessor() {
        assert_eq!(ApiError::RecordNotFound.status(), Some(404));
        assert_eq!(
            ApiError::Unclassified { status: 418, payload: Value::Null }.status(),
            Some(418)
        );
        assert_eq!(ApiError::Timeout.status(), None);
    }
}
