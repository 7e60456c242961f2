// ABOUTME: The session seam between the HTTP gateway and the SMPP transceiver
// ABOUTME: Lets the gateway and lifecycle run against a fake session in tests

use crate::client::error::SmppResult;
use crate::client::status::StatusEvents;
use crate::client::types::SmsMessage;
use std::future::Future;

/// A long-lived SMPP session as seen by the gateway.
///
/// Implementations are shared behind an `Arc` and must accept concurrent
/// calls to `submit`.
pub trait SmppSession: Send + Sync + 'static {
    /// Submit one message and wait for the SMSC's message id.
    fn submit(&self, message: SmsMessage) -> impl Future<Output = SmppResult<String>> + Send;

    /// Take the status event stream. Only the first call returns it.
    fn status_events(&self) -> Option<StatusEvents>;

    /// Unbind and release the connection. Calling it again is a no-op.
    fn close(&self) -> impl Future<Output = SmppResult<()>> + Send;

    /// The SMSC address the session talks to
    fn addr(&self) -> &str;
}
