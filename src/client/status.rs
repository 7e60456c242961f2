// ABOUTME: Connection status events emitted by the transceiver on every link transition
// ABOUTME: Events travel over an unbounded channel so the session never waits on a consumer

use std::fmt;
use tokio::sync::mpsc;

/// State of the link to the SMSC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnStatus {
    Connecting,
    Bound,
    Disconnected,
    Reconnecting,
    ConnectionFailed,
    BindFailed,
    Closed,
}

impl fmt::Display for ConnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnStatus::Connecting => "connecting",
            ConnStatus::Bound => "bound",
            ConnStatus::Disconnected => "disconnected",
            ConnStatus::Reconnecting => "reconnecting",
            ConnStatus::ConnectionFailed => "connection failed",
            ConnStatus::BindFailed => "bind failed",
            ConnStatus::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// One link transition, with the error that caused it if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnStatusEvent {
    pub status: ConnStatus,
    pub error: Option<String>,
}

impl ConnStatusEvent {
    pub fn new(status: ConnStatus) -> Self {
        Self {
            status,
            error: None,
        }
    }

    pub fn with_error(status: ConnStatus, error: impl ToString) -> Self {
        Self {
            status,
            error: Some(error.to_string()),
        }
    }
}

/// Receiving end of the status stream. Ends when the session task exits.
pub type StatusEvents = mpsc::UnboundedReceiver<ConnStatusEvent>;

/// Sending half used by the session task. Sends after the consumer went away
/// are dropped silently.
#[derive(Debug, Clone)]
pub struct StatusSender(mpsc::UnboundedSender<ConnStatusEvent>);

impl StatusSender {
    pub fn channel() -> (Self, StatusEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self(tx), rx)
    }

    pub fn send(&self, event: ConnStatusEvent) {
        tracing::debug!(status = %event.status, error = ?event.error, "connection status");
        let _ = self.0.send(event);
    }

    pub fn status(&self, status: ConnStatus) {
        self.send(ConnStatusEvent::new(status));
    }

    pub fn failure(&self, status: ConnStatus, error: impl ToString) {
        self.send(ConnStatusEvent::with_error(status, error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_names() {
        assert_eq!(ConnStatus::Bound.to_string(), "bound");
        assert_eq!(ConnStatus::ConnectionFailed.to_string(), "connection failed");
        assert_eq!(ConnStatus::BindFailed.to_string(), "bind failed");
    }

    #[tokio::test]
    async fn events_arrive_in_order_and_end_with_sender() {
        let (tx, mut rx) = StatusSender::channel();
        tx.status(ConnStatus::Connecting);
        tx.failure(ConnStatus::ConnectionFailed, "refused");
        drop(tx);

        assert_eq!(rx.recv().await, Some(ConnStatusEvent::new(ConnStatus::Connecting)));
        assert_eq!(
            rx.recv().await,
            Some(ConnStatusEvent::with_error(ConnStatus::ConnectionFailed, "refused"))
        );
        assert_eq!(rx.recv().await, None);
    }
}
