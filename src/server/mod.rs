// ABOUTME: Process level plumbing: HTTP listener, TLS material, request log and lifecycle
// ABOUTME: ServerError covers every way startup can fail

mod access_log;
mod lifecycle;
mod listener;
mod static_files;
mod telemetry;
mod tls;

pub use access_log::access_log;
pub use lifecycle::{LifecycleState, Server, ShutdownSignal};
pub use listener::HttpListener;
pub use static_files::static_files;
pub use telemetry::{init_tracing, DEFAULT_LOG_FILTER};
pub use tls::{build_server_config, load_certs, load_private_key, server_config};

use crate::client::SmppError;
use crate::config::ConfigError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid TLS material in {path}: {reason}")]
    TlsMaterial { path: String, reason: String },

    #[error("TLS configuration error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("client certificate verification setup failed: {0}")]
    ClientVerifier(#[from] rustls::server::VerifierBuilderError),

    #[error("SMPP session setup failed: {0}")]
    Smpp(#[from] SmppError),

    #[error("failed to install signal handler: {0}")]
    Signal(#[source] io::Error),

    #[error("failed to initialise logging: {0}")]
    Telemetry(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
