//! Errors returned by the HTTP interception layer.
//!
//! Worker and tool errors use [`offcache_core::Error`]; these only cover
//! requests the proxy itself refuses or cannot forward.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The request target cannot be mapped onto the origin.
    #[error("BAD_REQUEST: {0}")]
    BadRequest(String),

    /// The request body exceeds the configured limit.
    #[error("PAYLOAD_TOO_LARGE: request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    /// A pass-through request got no response from the origin.
    #[error("BAD_GATEWAY: {0}")]
    BadGateway(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::BadGateway(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({ "error": status.canonical_reason(), "message": self.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ProxyError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ProxyError::PayloadTooLarge(10).status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ProxyError::BadGateway("x".into()).status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_display_prefix() {
        let err = ProxyError::PayloadTooLarge(1024);
        assert_eq!(err.to_string(), "PAYLOAD_TOO_LARGE: request body exceeds 1024 bytes");
    }
}
