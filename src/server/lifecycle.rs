// ABOUTME: Process lifecycle: start the session, serve HTTP, then drain on a shutdown signal
// ABOUTME: The session is closed exactly once before run returns, whatever ended serving

use crate::client::{SmppSession, StatusEvents, Transceiver};
use crate::config::GatewayConfig;
use crate::gateway::{spawn_monitor, Gateway};
use crate::server::access_log::access_log;
use crate::server::listener::HttpListener;
use crate::server::static_files::static_files;
use crate::server::{tls, ServerError};
use axum::{middleware, Router};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How long draining waits for the monitor to log the final events
const MONITOR_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle states, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Configuring,
    Connecting,
    Serving,
    Draining,
    Terminated,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Configuring => "configuring",
            LifecycleState::Connecting => "connecting",
            LifecycleState::Serving => "serving",
            LifecycleState::Draining => "draining",
            LifecycleState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// The gateway process: one SMPP session behind one HTTP listener.
pub struct Server<S> {
    config: Arc<GatewayConfig>,
    session: Arc<S>,
    state: watch::Sender<LifecycleState>,
}

impl Server<Transceiver> {
    /// Start the transceiver for `config`. Connecting and binding continue
    /// in the background.
    pub fn connect(config: GatewayConfig) -> Result<Self, ServerError> {
        let (state, _) = watch::channel(LifecycleState::Configuring);
        transition(&state, LifecycleState::Connecting);

        let transceiver = config.transceiver_config()?;
        info!(
            smsc = %config.smpp_addr,
            tls = config.smsc_tls,
            "starting SMPP transceiver"
        );
        let session = Arc::new(Transceiver::start(transceiver));

        Ok(Self {
            config: Arc::new(config),
            session,
            state,
        })
    }
}

impl<S: SmppSession> Server<S> {
    /// A server around an already started session
    pub fn with_session(config: GatewayConfig, session: Arc<S>) -> Self {
        let (state, _) = watch::channel(LifecycleState::Connecting);
        Self {
            config: Arc::new(config),
            session,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<(), ServerError> {
        let listener = match self.bind().await {
            Ok(listener) => listener,
            Err(error) => {
                self.drain(None).await;
                return Err(error);
            }
        };
        self.run_with_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves or the
    /// listener fails, then drain.
    pub async fn run_with_listener(
        self,
        listener: HttpListener,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), ServerError> {
        transition(&self.state, LifecycleState::Serving);

        let (app, events) = self.router();
        let monitor = events.map(|events| spawn_monitor(self.session.addr(), events));

        let outcome = tokio::select! {
            result = listener.serve(app) => {
                if let Err(error) = &result {
                    error!(%error, "HTTP listener failed");
                }
                result
            }
            _ = shutdown => {
                info!("shutdown signal received");
                Ok(())
            }
        };

        self.drain(monitor).await;
        outcome
    }

    async fn bind(&self) -> Result<HttpListener, ServerError> {
        let tls = match &self.config.server_tls {
            Some(files) => Some(tls::server_config(files)?),
            None => None,
        };
        HttpListener::bind(&self.config.listen, tls).await
    }

    /// Gateway routes under the prefix, then static files, then the
    /// request log around everything.
    pub fn router(&self) -> (Router, Option<StatusEvents>) {
        let gateway = Gateway::new(self.session.clone())
            .with_prefix(&self.config.prefix)
            .with_submit_timeout(self.config.submit_timeout);
        let (mut router, events) = gateway.register(Router::new());

        if let Some(dir) = &self.config.public_dir {
            info!(dir = %dir.display(), "serving static files");
            router = router.merge(static_files(gateway.prefix(), dir.clone()));
        }

        if self.config.access_log {
            router = router.layer(middleware::from_fn(access_log));
        }

        (router, events)
    }

    async fn drain(&self, monitor: Option<JoinHandle<()>>) {
        transition(&self.state, LifecycleState::Draining);

        if let Err(error) = self.session.close().await {
            warn!(%error, "error closing SMPP session");
        }

        if let Some(mut monitor) = monitor {
            if tokio::time::timeout(MONITOR_DRAIN_TIMEOUT, &mut monitor)
                .await
                .is_err()
            {
                warn!("connection monitor did not finish, aborting it");
                monitor.abort();
            }
        }

        transition(&self.state, LifecycleState::Terminated);
    }
}

fn transition(state: &watch::Sender<LifecycleState>, next: LifecycleState) {
    let previous = state.send_replace(next);
    info!(from = %previous, to = %next, "lifecycle transition");
}

/// SIGINT and SIGTERM listeners, registered as soon as `install` returns
pub struct ShutdownSignal {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl ShutdownSignal {
    #[cfg(unix)]
    pub fn install() -> Result<Self, ServerError> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).map_err(ServerError::Signal)?,
            terminate: signal(SignalKind::terminate()).map_err(ServerError::Signal)?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> Result<Self, ServerError> {
        Ok(Self {})
    }

    /// Resolves on the first SIGINT or SIGTERM.
    #[cfg(unix)]
    pub async fn recv(mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => info!("received SIGINT"),
            _ = self.terminate.recv() => info!("received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(self) {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C"),
            Err(error) => {
                error!(%error, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await
            }
        }
    }
}
