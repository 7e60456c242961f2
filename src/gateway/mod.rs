// ABOUTME: HTTP side of the gateway: the send route, its error mapping and auth hook
// ABOUTME: Also hosts the monitor that turns session status events into log lines

mod auth;
mod error;
mod handler;
mod monitor;

pub use auth::{authenticate, Authenticator, PassThrough};
pub use error::{ErrorBody, GatewayError};
pub use handler::{
    normalize_prefix, Gateway, SendForm, SendRequest, SendResponse, DEFAULT_SUBMIT_TIMEOUT,
};
pub use monitor::{format_event, spawn_monitor};
