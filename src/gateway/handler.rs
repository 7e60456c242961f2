// ABOUTME: HTTP routes that turn send requests into SMPP submits
// ABOUTME: Parses JSON or form bodies, validates them and maps the outcome to a response

use crate::client::{SmppSession, SmsMessage, StatusEvents};
use crate::datatypes::short_message::{encode_text, ADDRESS_SIZE, MAX_SHORT_MESSAGE_LENGTH};
use crate::gateway::auth::{authenticate, Authenticator, PassThrough};
use crate::gateway::GatewayError;
use axum::extract::{FromRequest, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::routing::post;
use axum::{middleware, Form, Json, Router};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bound on how long a request waits for the SMSC
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of a send request as it arrives. Field names follow the public API,
/// with the legacy `dst`, `text` and `src` names accepted as aliases.
#[derive(Debug, Default, Deserialize)]
pub struct SendForm {
    #[serde(default, alias = "dst")]
    pub to: Option<String>,
    #[serde(default, alias = "text")]
    pub body: Option<String>,
    #[serde(default, alias = "src")]
    pub from: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub register: bool,
}

/// A validated send request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    pub to: String,
    pub body: String,
    pub from: Option<String>,
    pub register: bool,
}

impl TryFrom<SendForm> for SendRequest {
    type Error = GatewayError;

    fn try_from(form: SendForm) -> Result<Self, Self::Error> {
        let to = required(form.to, "to")?.trim().to_string();
        let body = required(form.body, "body")?;

        if to.len() >= ADDRESS_SIZE {
            return Err(GatewayError::BadRequest(format!(
                "'to' exceeds {} characters",
                ADDRESS_SIZE - 1
            )));
        }
        let (_, encoded) = encode_text(&body);
        if encoded.len() > MAX_SHORT_MESSAGE_LENGTH {
            return Err(GatewayError::BadRequest(format!(
                "'body' exceeds {MAX_SHORT_MESSAGE_LENGTH} bytes once encoded"
            )));
        }

        let from = form
            .from
            .map(|from| from.trim().to_string())
            .filter(|from| !from.is_empty());
        if let Some(from) = &from {
            if from.len() >= ADDRESS_SIZE {
                return Err(GatewayError::BadRequest(format!(
                    "'from' exceeds {} characters",
                    ADDRESS_SIZE - 1
                )));
            }
        }

        Ok(SendRequest {
            to,
            body,
            from,
            register: form.register,
        })
    }
}

/// Rejects a missing or blank field. The value itself is passed on as sent.
fn required(value: Option<String>, field: &str) -> Result<String, GatewayError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(GatewayError::BadRequest(format!("missing '{field}'"))),
    }
}

impl From<SendRequest> for SmsMessage {
    fn from(request: SendRequest) -> Self {
        SmsMessage::new(request.to, request.body)
            .with_source(request.from.unwrap_or_default())
            .with_delivery_receipt(request.register)
    }
}

/// Accepts JSON booleans as well as the strings forms send: true/false,
/// 1/0, on/off, yes/no.
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "on" | "yes" => Ok(true),
            "false" | "0" | "off" | "no" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "invalid boolean '{other}'"
            ))),
        },
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendResponse {
    pub message_id: String,
}

/// Normalize a route prefix: no trailing slash, a leading slash unless
/// empty. `/` and the empty string both mean the root.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

struct GatewayState<S> {
    session: Arc<S>,
    submit_timeout: Option<Duration>,
}

impl<S> Clone for GatewayState<S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            submit_timeout: self.submit_timeout,
        }
    }
}

/// The HTTP side of the gateway: mounts `POST <prefix>/send` in front of a
/// shared SMPP session.
pub struct Gateway<S> {
    session: Arc<S>,
    prefix: String,
    submit_timeout: Option<Duration>,
    authenticator: Arc<dyn Authenticator>,
}

impl<S: SmppSession> Gateway<S> {
    pub fn new(session: Arc<S>) -> Self {
        Self {
            session,
            prefix: String::new(),
            submit_timeout: Some(DEFAULT_SUBMIT_TIMEOUT),
            authenticator: Arc::new(PassThrough),
        }
    }

    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = normalize_prefix(prefix);
        self
    }

    /// Bound on each submit. `None` waits as long as the session does.
    pub fn with_submit_timeout(mut self, submit_timeout: Option<Duration>) -> Self {
        self.submit_timeout = submit_timeout;
        self
    }

    pub fn with_authenticator(mut self, authenticator: impl Authenticator) -> Self {
        self.authenticator = Arc::new(authenticator);
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The gateway routes, wrapped by the authenticator.
    pub fn routes(&self) -> Router {
        let state = GatewayState {
            session: self.session.clone(),
            submit_timeout: self.submit_timeout,
        };

        Router::new()
            .route(&format!("{}/send", self.prefix), post(send::<S>))
            .route_layer(middleware::from_fn_with_state(
                self.authenticator.clone(),
                authenticate,
            ))
            .with_state(state)
    }

    /// Mount the routes on `router` and hand back the session's status
    /// events, which are only available to the first caller.
    pub fn register(&self, router: Router) -> (Router, Option<StatusEvents>) {
        debug!(prefix = %self.prefix, "mounting gateway routes");
        (router.merge(self.routes()), self.session.status_events())
    }
}

async fn send<S: SmppSession>(
    State(state): State<GatewayState<S>>,
    request: Request,
) -> Result<Json<SendResponse>, GatewayError> {
    let form = parse_body(request).await?;
    let request = SendRequest::try_from(form)?;
    let to = request.to.clone();

    let submit = state.session.submit(SmsMessage::from(request));
    let result = match state.submit_timeout {
        Some(limit) => tokio::time::timeout(limit, submit)
            .await
            .map_err(|_| GatewayError::Timeout(limit))?,
        None => submit.await,
    };

    match result {
        Ok(message_id) => {
            info!(%to, %message_id, "message submitted");
            Ok(Json(SendResponse { message_id }))
        }
        Err(error) => {
            warn!(%to, %error, "submit failed");
            Err(error.into())
        }
    }
}

async fn parse_body(request: Request) -> Result<SendForm, GatewayError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match mime.as_str() {
        "application/json" => {
            let Json(form) = Json::<SendForm>::from_request(request, &())
                .await
                .map_err(|rejection| GatewayError::BadRequest(rejection.body_text()))?;
            Ok(form)
        }
        "application/x-www-form-urlencoded" => {
            let Form(form) = Form::<SendForm>::from_request(request, &())
                .await
                .map_err(|rejection| GatewayError::BadRequest(rejection.body_text()))?;
            Ok(form)
        }
        _ => Err(GatewayError::UnsupportedMediaType(content_type)),
    }
}
