// ABOUTME: Installs the global tracing subscriber for the binary
// ABOUTME: RUST_LOG filters output, timestamps can be switched off

use crate::server::ServerError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when RUST_LOG is unset
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Install the process wide subscriber. Fails if one is already set.
pub fn init_tracing(log_timestamp: bool) -> Result<(), ServerError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::registry().with(env_filter);

    let result = if log_timestamp {
        subscriber.with(fmt::layer().with_target(true)).try_init()
    } else {
        subscriber
            .with(fmt::layer().with_target(true).without_time())
            .try_init()
    };

    result.map_err(|error| ServerError::Telemetry(error.to_string()))
}
