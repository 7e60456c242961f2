// ABOUTME: Drains connection status events into log lines on a dedicated task
// ABOUTME: One line per event, in the order the session emitted them

use crate::client::{ConnStatus, ConnStatusEvent, StatusEvents};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// The log line for one status event
pub fn format_event(address: &str, event: &ConnStatusEvent) -> String {
    match &event.error {
        Some(error) => format!(
            "SMPP connection status to {address}: {} ({error})",
            event.status
        ),
        None => format!("SMPP connection status to {address}: {}", event.status),
    }
}

/// Log every event from `events` until the session closes the stream.
pub fn spawn_monitor(address: impl Into<String>, mut events: StatusEvents) -> JoinHandle<()> {
    let address = address.into();

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let line = format_event(&address, &event);
            match event.status {
                ConnStatus::ConnectionFailed | ConnStatus::BindFailed => {
                    warn!(target: "sms_api_server::monitor", "{line}")
                }
                _ => info!(target: "sms_api_server::monitor", "{line}"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::StatusSender;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn formats_with_and_without_error() {
        assert_eq!(
            format_event("smsc:2775", &ConnStatusEvent::new(ConnStatus::Bound)),
            "SMPP connection status to smsc:2775: bound"
        );
        assert_eq!(
            format_event(
                "smsc:2775",
                &ConnStatusEvent::with_error(ConnStatus::ConnectionFailed, "connection refused")
            ),
            "SMPP connection status to smsc:2775: connection failed (connection refused)"
        );
    }

    #[test]
    fn logs_one_line_per_event_in_order() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .without_time(),
        );
        let _guard = tracing::subscriber::set_default(subscriber);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let (tx, rx) = StatusSender::channel();
            let monitor = spawn_monitor("smsc:2775", rx);

            for status in [
                ConnStatus::Connecting,
                ConnStatus::Bound,
                ConnStatus::Disconnected,
                ConnStatus::Reconnecting,
                ConnStatus::Bound,
            ] {
                tx.status(status);
            }
            drop(tx);

            monitor.await.unwrap();
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = output
            .lines()
            .filter(|line| line.contains("SMPP connection status"))
            .collect();

        assert_eq!(lines.len(), 5);
        for (line, status) in lines
            .iter()
            .zip(["connecting", "bound", "disconnected", "reconnecting", "bound"])
        {
            assert!(
                line.ends_with(&format!("SMPP connection status to smsc:2775: {status}")),
                "unexpected line: {line}"
            );
        }
    }
}
