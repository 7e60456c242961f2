// ABOUTME: Authentication hook wrapped around every gateway route
// ABOUTME: The default pass-through lets every request reach the handler

use crate::gateway::GatewayError;
use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::warn;

/// Decides whether a request may reach the gateway handler.
///
/// Return `GatewayError::Unauthorized` or `GatewayError::Forbidden` to
/// reject it.
pub trait Authenticator: Send + Sync + 'static {
    fn authenticate(&self, parts: &Parts) -> Result<(), GatewayError>;
}

/// Accepts every request
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl Authenticator for PassThrough {
    fn authenticate(&self, _parts: &Parts) -> Result<(), GatewayError> {
        Ok(())
    }
}

/// Middleware running the configured `Authenticator`
pub async fn authenticate(
    State(authenticator): State<Arc<dyn Authenticator>>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    if let Err(rejection) = authenticator.authenticate(&parts) {
        warn!(uri = %parts.uri, error = %rejection, "request rejected");
        return rejection.into_response();
    }

    next.run(Request::from_parts(parts, body)).await
}
