// ABOUTME: enquire_link keep-alive bookkeeping for the transceiver session task
// ABOUTME: Tracks the outstanding ping and decides when a silent link counts as dead

use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

/// Configuration for the enquire_link keep-alive
///
/// While bound the session sends an enquire_link every `interval`. If the
/// matching enquire_link_resp has not arrived within `timeout`, that counts
/// as a failure; `max_failures` consecutive failures drop the link.
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Interval between enquire_link PDUs (default: 10 seconds)
    pub interval: Duration,

    /// Time allowed for the enquire_link_resp (default: 10 seconds)
    pub timeout: Duration,

    /// Consecutive failures before the link is dropped (default: 1)
    pub max_failures: u32,

    /// When false no enquire_link PDUs are sent
    pub enabled: bool,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(10),
            max_failures: 1,
            enabled: true,
        }
    }
}

impl KeepAliveConfig {
    /// Keep-alive with the given interval. A zero interval disables it.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            enabled: !interval.is_zero(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures;
        self
    }
}

/// Per-link keep-alive state, driven from the session's select loop
#[derive(Debug)]
pub struct KeepAliveManager {
    config: KeepAliveConfig,

    /// Sequence number and send time of the unanswered enquire_link
    outstanding: Option<(u32, Instant)>,

    consecutive_failures: u32,
    total_pings: u32,
}

impl KeepAliveManager {
    pub fn new(config: KeepAliveConfig) -> Self {
        Self {
            config,
            outstanding: None,
            consecutive_failures: 0,
            total_pings: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// A new ping is due unless one is still waiting for its response.
    pub fn should_ping(&self) -> bool {
        self.config.enabled
            && self.outstanding.is_none()
            && !self.is_connection_failed()
    }

    pub fn on_ping_sent(&mut self, sequence_number: u32) {
        self.outstanding = Some((sequence_number, Instant::now()));
        self.total_pings += 1;
        debug!(sequence_number, total = self.total_pings, "enquire_link sent");
    }

    /// Record an enquire_link_resp. Returns false if it does not answer the
    /// outstanding ping.
    pub fn on_pong(&mut self, sequence_number: u32) -> bool {
        match self.outstanding {
            Some((expected, _)) if expected == sequence_number => {
                self.outstanding = None;
                self.consecutive_failures = 0;
                true
            }
            _ => false,
        }
    }

    /// When the outstanding ping times out, if one is in flight.
    pub fn response_deadline(&self) -> Option<Instant> {
        self.outstanding
            .map(|(_, sent_at)| sent_at + self.config.timeout)
    }

    /// Record a ping that got no answer in time.
    pub fn on_ping_failure(&mut self) {
        self.outstanding = None;
        self.consecutive_failures += 1;
        warn!(
            consecutive_failures = self.consecutive_failures,
            "enquire_link timed out"
        );
    }

    /// Any inbound traffic proves the link is alive.
    pub fn reset_failures(&mut self) {
        self.consecutive_failures = 0;
    }

    pub fn is_connection_failed(&self) -> bool {
        self.consecutive_failures >= self.config.max_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = KeepAliveConfig::default();
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_failures, 1);
        assert!(config.enabled);
    }

    #[test]
    fn zero_interval_disables() {
        let config = KeepAliveConfig::new(Duration::ZERO);
        assert!(!config.enabled);
        assert!(!KeepAliveManager::new(config).should_ping());
    }

    #[tokio::test(start_paused = true)]
    async fn pong_clears_outstanding_ping() {
        let mut manager = KeepAliveManager::new(KeepAliveConfig::default());
        assert!(manager.should_ping());

        manager.on_ping_sent(7);
        assert!(!manager.should_ping());
        assert_eq!(
            manager.response_deadline(),
            Some(Instant::now() + Duration::from_secs(10))
        );

        assert!(!manager.on_pong(8));
        assert!(manager.on_pong(7));
        assert!(manager.should_ping());
        assert_eq!(manager.response_deadline(), None);
    }

    #[test]
    fn failure_tracking() {
        let config = KeepAliveConfig::default().with_max_failures(2);
        let mut manager = KeepAliveManager::new(config);

        manager.on_ping_sent(1);
        manager.on_ping_failure();
        assert!(!manager.is_connection_failed());
        assert!(manager.should_ping());

        manager.on_ping_sent(2);
        manager.on_ping_failure();
        assert!(manager.is_connection_failed());
        assert!(!manager.should_ping());

        manager.reset_failures();
        assert!(!manager.is_connection_failed());
    }
}
