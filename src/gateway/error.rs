// ABOUTME: Maps validation, auth and SMPP failures onto HTTP status codes
// ABOUTME: Every error renders as a JSON object with `error` and `detail` fields

use crate::client::SmppError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    BadRequest(String),

    #[error("unsupported content type '{0}', expected application/json or application/x-www-form-urlencoded")]
    UnsupportedMediaType(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("no response from SMSC within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Smpp(#[from] SmppError),
}

/// Body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub detail: String,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden(_) => StatusCode::FORBIDDEN,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Smpp(error) => match error {
                SmppError::InvalidData(_) => StatusCode::BAD_REQUEST,
                SmppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                error if error.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
                SmppError::Protocol(_) | SmppError::Codec(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            GatewayError::BadRequest(_) => "bad_request",
            GatewayError::UnsupportedMediaType(_) => "unsupported_media_type",
            GatewayError::Unauthorized(_) => "unauthorized",
            GatewayError::Forbidden(_) => "forbidden",
            GatewayError::Timeout(_) => "timeout",
            GatewayError::Smpp(_) => match self.status_code() {
                StatusCode::BAD_REQUEST => "bad_request",
                StatusCode::BAD_GATEWAY => "smsc_rejected",
                StatusCode::GATEWAY_TIMEOUT => "timeout",
                _ => "smsc_unavailable",
            },
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            detail: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::CommandStatus;

    #[test]
    fn smpp_errors_map_to_gateway_statuses() {
        let cases = [
            (SmppError::Protocol(CommandStatus::MessageQueueFull), StatusCode::BAD_GATEWAY),
            (SmppError::NotBound, StatusCode::SERVICE_UNAVAILABLE),
            (SmppError::ConnectionClosed, StatusCode::SERVICE_UNAVAILABLE),
            (SmppError::SessionClosed, StatusCode::SERVICE_UNAVAILABLE),
            (SmppError::Timeout, StatusCode::GATEWAY_TIMEOUT),
            (SmppError::InvalidData("too long".into()), StatusCode::BAD_REQUEST),
        ];

        for (error, expected) in cases {
            assert_eq!(GatewayError::from(error).status_code(), expected);
        }
    }

    #[test]
    fn kinds() {
        assert_eq!(
            GatewayError::from(SmppError::NotBound).kind(),
            "smsc_unavailable"
        );
        assert_eq!(
            GatewayError::Timeout(Duration::from_secs(1)).kind(),
            "timeout"
        );
    }
}
