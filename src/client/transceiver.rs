// ABOUTME: Long-lived SMPP transceiver session running on its own tokio task
// ABOUTME: Binds, keeps the link alive, correlates submits and reconnects with backoff

use crate::client::error::{SmppError, SmppResult};
use crate::client::keepalive::{KeepAliveConfig, KeepAliveManager};
use crate::client::status::{ConnStatus, StatusEvents, StatusSender};
use crate::client::tls::SmscTls;
use crate::client::traits::SmppSession;
use crate::client::types::{BindCredentials, SmsMessage};
use crate::codec::{CodecError, Frame};
use crate::connection::Connection;
use crate::datatypes::{
    BindTransceiver, BindTransceiverResponse, CommandStatus, DeliverSmResponse, EnquireLink,
    EnquireLinkResponse, GenericNack, Unbind, UnbindResponse,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, sleep_until, timeout, Duration, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Depth of the submit queue between callers and the session task
const COMMAND_QUEUE: usize = 1024;

/// Largest sequence number before wrapping back to 1
const MAX_SEQUENCE: u32 = 0x7FFF_FFFF;

/// Delay between reconnection attempts: starts at `initial` and doubles after
/// every failed attempt up to `max`. A successful bind resets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(60),
        }
    }
}

impl ReconnectPolicy {
    pub fn next(&self, current: Duration) -> Duration {
        (current * 2).min(self.max)
    }
}

/// Everything the session task needs to reach and bind to the SMSC
#[derive(Debug, Clone)]
pub struct TransceiverConfig {
    /// host:port of the SMSC
    pub address: String,
    pub credentials: BindCredentials,
    /// TLS to the SMSC, plain TCP when `None`
    pub tls: Option<SmscTls>,
    pub keepalive: KeepAliveConfig,
    pub reconnect: ReconnectPolicy,
    /// Bound on TCP connect, TLS handshake, bind_transceiver_resp and
    /// unbind_resp waits
    pub response_timeout: Duration,
}

impl TransceiverConfig {
    pub fn new(address: impl Into<String>, credentials: BindCredentials) -> Self {
        Self {
            address: address.into(),
            credentials,
            tls: None,
            keepalive: KeepAliveConfig::default(),
            reconnect: ReconnectPolicy::default(),
            response_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_tls(mut self, tls: SmscTls) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn with_keepalive(mut self, keepalive: KeepAliveConfig) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }
}

type Reply = oneshot::Sender<SmppResult<String>>;

enum Command {
    Submit { message: SmsMessage, reply: Reply },
}

impl Command {
    fn reject(self, error: SmppError) {
        match self {
            Command::Submit { reply, .. } => {
                let _ = reply.send(Err(error));
            }
        }
    }
}

/// Handle to a transceiver session.
///
/// `start` spawns the session task and returns immediately; connecting and
/// binding happen in the background and are reported as status events.
pub struct Transceiver {
    addr: String,
    commands: mpsc::Sender<Command>,
    bound: Arc<AtomicBool>,
    closed: AtomicBool,
    status: Mutex<Option<StatusEvents>>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Transceiver {
    /// Spawn the session task. Must be called from within a tokio runtime.
    pub fn start(config: TransceiverConfig) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_QUEUE);
        let (status_tx, status_rx) = StatusSender::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let bound = Arc::new(AtomicBool::new(false));
        let addr = config.address.clone();

        let task = SessionTask {
            config,
            commands: commands_rx,
            shutdown: shutdown_rx,
            status: status_tx,
            bound: bound.clone(),
        };
        let handle = tokio::spawn(task.run());

        Self {
            addr,
            commands: commands_tx,
            bound,
            closed: AtomicBool::new(false),
            status: Mutex::new(Some(status_rx)),
            shutdown: Mutex::new(Some(shutdown_tx)),
            task: Mutex::new(Some(handle)),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::Acquire)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SmppSession for Transceiver {
    async fn submit(&self, message: SmsMessage) -> SmppResult<String> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SmppError::SessionClosed);
        }
        if !self.is_bound() {
            return Err(SmppError::NotBound);
        }

        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Submit { message, reply })
            .await
            .map_err(|_| SmppError::SessionClosed)?;

        response.await.map_err(|_| SmppError::SessionClosed)?
    }

    fn status_events(&self) -> Option<StatusEvents> {
        lock(&self.status).take()
    }

    async fn close(&self) -> SmppResult<()> {
        let Some(shutdown) = lock(&self.shutdown).take() else {
            return Ok(());
        };
        self.closed.store(true, Ordering::Release);
        let _ = shutdown.send(());

        let task = lock(&self.task).take();
        if let Some(task) = task {
            task.await
                .map_err(|e| SmppError::Connection(std::io::Error::other(e)))?;
        }
        Ok(())
    }

    fn addr(&self) -> &str {
        &self.addr
    }
}

/// Per-link sequence numbers, 1..=0x7FFFFFFF
#[derive(Debug, Default)]
struct Sequence(u32);

impl Sequence {
    fn next(&mut self) -> u32 {
        self.0 = if self.0 >= MAX_SEQUENCE { 1 } else { self.0 + 1 };
        self.0
    }
}

trait SmscIo: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> SmscIo for T {}

type SmscConnection = Connection<Box<dyn SmscIo>>;

struct Link {
    conn: SmscConnection,
    sequence: Sequence,
}

enum LinkFailure {
    Connect(SmppError),
    Bind(SmppError),
}

enum LinkEnd {
    /// Closed on request, after unbinding
    Closed,
    /// Lost, with the reason
    Dropped(String),
}

enum Inbound {
    Continue,
    UnboundByPeer,
}

struct SessionTask {
    config: TransceiverConfig,
    commands: mpsc::Receiver<Command>,
    shutdown: oneshot::Receiver<()>,
    status: StatusSender,
    bound: Arc<AtomicBool>,
}

impl SessionTask {
    async fn run(mut self) {
        let address = self.config.address.clone();
        let mut backoff = self.config.reconnect.initial;
        let mut attempt_status = ConnStatus::Connecting;

        loop {
            self.status.status(attempt_status);

            let attempt = establish(&self.config);
            let Some(result) = unbound(&mut self.commands, &mut self.shutdown, attempt).await
            else {
                break;
            };

            match result {
                Ok(link) => {
                    info!(%address, "bound to SMSC");
                    backoff = self.config.reconnect.initial;
                    self.bound.store(true, Ordering::Release);
                    self.status.status(ConnStatus::Bound);

                    let end = self.serve(link).await;
                    self.bound.store(false, Ordering::Release);

                    match end {
                        LinkEnd::Closed => break,
                        LinkEnd::Dropped(error) => {
                            warn!(%address, %error, "SMSC link lost");
                            self.status.failure(ConnStatus::Disconnected, error);
                        }
                    }
                }
                Err(LinkFailure::Connect(error)) => {
                    warn!(%address, %error, "failed to connect to SMSC");
                    self.status.failure(ConnStatus::ConnectionFailed, error);
                }
                Err(LinkFailure::Bind(error)) => {
                    warn!(%address, %error, "bind_transceiver failed");
                    self.status.failure(ConnStatus::BindFailed, error);
                }
            }

            debug!(?backoff, "waiting before reconnecting");
            if unbound(&mut self.commands, &mut self.shutdown, sleep(backoff))
                .await
                .is_none()
            {
                break;
            }
            backoff = self.config.reconnect.next(backoff);
            attempt_status = ConnStatus::Reconnecting;
        }

        self.status.status(ConnStatus::Closed);
        info!(%address, "SMPP session closed");
    }

    /// Drive a bound link until it drops or the session is closed.
    async fn serve(&mut self, link: Link) -> LinkEnd {
        let Link {
            mut conn,
            mut sequence,
        } = link;
        let response_timeout = self.config.response_timeout;
        let mut pending: HashMap<u32, Reply> = HashMap::new();
        let mut keepalive = KeepAliveManager::new(self.config.keepalive.clone());

        let period = if keepalive.is_enabled() {
            keepalive.interval()
        } else {
            Duration::from_secs(3600)
        };
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let end = loop {
            let deadline = keepalive.response_deadline();

            tokio::select! {
                biased;

                _ = &mut self.shutdown => {
                    unbind(&mut conn, &mut sequence, response_timeout).await;
                    break LinkEnd::Closed;
                }

                frame = conn.read_frame() => match frame {
                    Ok(Some(frame)) => {
                        match handle_inbound(&mut conn, &mut pending, &mut keepalive, frame).await {
                            Ok(Inbound::Continue) => {}
                            Ok(Inbound::UnboundByPeer) => {
                                break LinkEnd::Dropped("unbound by SMSC".to_string());
                            }
                            Err(error) => break LinkEnd::Dropped(error.to_string()),
                        }
                    }
                    Ok(None) => break LinkEnd::Dropped("connection closed by SMSC".to_string()),
                    Err(SmppError::Codec(error)) if !matches!(error, CodecError::InvalidPduLength { .. }) => {
                        warn!(%error, "malformed PDU from SMSC");
                        let nack = GenericNack::error(0, error.to_command_status());
                        if let Err(error) = conn.write_frame(&Frame::GenericNack(nack)).await {
                            break LinkEnd::Dropped(error.to_string());
                        }
                    }
                    Err(error) => break LinkEnd::Dropped(error.to_string()),
                },

                command = self.commands.recv() => match command {
                    Some(Command::Submit { message, reply }) => {
                        let seq = sequence.next();
                        let submit = Frame::SubmitSm(Box::new(message.to_submit_sm(seq)));

                        match conn.write_frame(&submit).await {
                            Ok(()) => {
                                debug!(seq, to = %message.to, "submit_sm sent");
                                pending.insert(seq, reply);
                            }
                            Err(SmppError::Codec(error)) => {
                                let _ = reply.send(Err(SmppError::InvalidData(error.to_string())));
                            }
                            Err(error) => {
                                let _ = reply.send(Err(SmppError::ConnectionClosed));
                                break LinkEnd::Dropped(error.to_string());
                            }
                        }
                    }
                    // Every handle is gone
                    None => {
                        unbind(&mut conn, &mut sequence, response_timeout).await;
                        break LinkEnd::Closed;
                    }
                },

                _ = ticker.tick(), if keepalive.is_enabled() => {
                    // Callers that gave up no longer need an answer
                    pending.retain(|_, reply| !reply.is_closed());

                    if keepalive.should_ping() {
                        let seq = sequence.next();
                        if let Err(error) = conn.write_frame(&Frame::EnquireLink(EnquireLink::new(seq))).await {
                            break LinkEnd::Dropped(error.to_string());
                        }
                        keepalive.on_ping_sent(seq);
                    }
                }

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    keepalive.on_ping_failure();
                    if keepalive.is_connection_failed() {
                        break LinkEnd::Dropped("enquire_link_resp not received".to_string());
                    }
                }
            }
        };

        for (_, reply) in pending.drain() {
            let error = match end {
                LinkEnd::Closed => SmppError::SessionClosed,
                LinkEnd::Dropped(_) => SmppError::ConnectionClosed,
            };
            let _ = reply.send(Err(error));
        }
        if let Err(error) = conn.shutdown().await {
            debug!(%error, "error shutting down SMSC connection");
        }

        end
    }
}

/// Run `fut` while the session is not bound: submits are refused with
/// `NotBound` and a close request wins. Returns `None` on close.
async fn unbound<F: Future>(
    commands: &mut mpsc::Receiver<Command>,
    shutdown: &mut oneshot::Receiver<()>,
    fut: F,
) -> Option<F::Output> {
    tokio::pin!(fut);

    loop {
        tokio::select! {
            biased;

            _ = &mut *shutdown => return None,
            result = &mut fut => return Some(result),
            Some(command) = commands.recv() => command.reject(SmppError::NotBound),
        }
    }
}

/// Connect, optionally run the TLS handshake, and bind as a transceiver.
async fn establish(config: &TransceiverConfig) -> Result<Link, LinkFailure> {
    let wait = config.response_timeout;

    let tcp = timeout(wait, TcpStream::connect(&config.address))
        .await
        .map_err(|_| LinkFailure::Connect(SmppError::Timeout))?
        .map_err(|e| LinkFailure::Connect(e.into()))?;
    tcp.set_nodelay(true)
        .map_err(|e| LinkFailure::Connect(e.into()))?;

    let stream: Box<dyn SmscIo> = match &config.tls {
        Some(tls) => {
            let tls_stream = timeout(wait, tls.connect(tcp))
                .await
                .map_err(|_| LinkFailure::Connect(SmppError::Timeout))?
                .map_err(LinkFailure::Connect)?;
            Box::new(tls_stream)
        }
        None => Box::new(tcp),
    };

    let mut conn = Connection::new(stream);
    let mut sequence = Sequence::default();
    let seq = sequence.next();

    let credentials = &config.credentials;
    let bind = BindTransceiver::new(seq, &credentials.system_id, &credentials.password);

    conn.write_frame(&Frame::BindTransceiver(bind))
        .await
        .map_err(LinkFailure::Bind)?;

    let response = timeout(wait, await_bind_response(&mut conn, seq))
        .await
        .map_err(|_| LinkFailure::Bind(SmppError::Timeout))?
        .map_err(LinkFailure::Bind)?;
    debug!(system_id = %response.system_id, "bind_transceiver_resp received");

    Ok(Link { conn, sequence })
}

async fn await_bind_response(
    conn: &mut SmscConnection,
    seq: u32,
) -> SmppResult<BindTransceiverResponse> {
    loop {
        match conn.read_frame().await? {
            Some(Frame::BindTransceiverResp(resp)) if resp.sequence_number == seq => {
                return if resp.command_status == CommandStatus::Ok {
                    Ok(resp)
                } else {
                    Err(SmppError::Protocol(resp.command_status))
                };
            }
            Some(Frame::GenericNack(nack)) => return Err(SmppError::Protocol(nack.command_status)),
            Some(other) => debug!(pdu = other.name(), "ignoring PDU while binding"),
            None => return Err(SmppError::ConnectionClosed),
        }
    }
}

async fn handle_inbound(
    conn: &mut SmscConnection,
    pending: &mut HashMap<u32, Reply>,
    keepalive: &mut KeepAliveManager,
    frame: Frame,
) -> SmppResult<Inbound> {
    keepalive.reset_failures();

    match frame {
        Frame::SubmitSmResp(resp) => {
            let result = if resp.command_status == CommandStatus::Ok {
                Ok(resp.message_id)
            } else {
                Err(SmppError::Protocol(resp.command_status))
            };
            complete(pending, resp.sequence_number, result);
        }
        Frame::GenericNack(nack) => {
            warn!(seq = nack.sequence_number, status = %nack.command_status, "generic_nack from SMSC");
            complete(
                pending,
                nack.sequence_number,
                Err(SmppError::Protocol(nack.command_status)),
            );
        }
        Frame::EnquireLink(req) => {
            let resp = EnquireLinkResponse::new(req.sequence_number);
            conn.write_frame(&Frame::EnquireLinkResp(resp)).await?;
        }
        Frame::EnquireLinkResp(resp) => {
            if !keepalive.on_pong(resp.sequence_number) {
                debug!(seq = resp.sequence_number, "unsolicited enquire_link_resp");
            }
        }
        Frame::DeliverSm(deliver) => {
            info!(
                from = %deliver.source_addr,
                to = %deliver.destination_addr,
                receipt = deliver.is_delivery_receipt(),
                text = %deliver.text(),
                "deliver_sm received"
            );
            let resp = DeliverSmResponse::new(deliver.sequence_number);
            conn.write_frame(&Frame::DeliverSmResp(resp)).await?;
        }
        Frame::Unbind(req) => {
            info!("SMSC requested unbind");
            let resp = UnbindResponse::new(req.sequence_number);
            conn.write_frame(&Frame::UnbindResp(resp)).await?;
            return Ok(Inbound::UnboundByPeer);
        }
        Frame::Unknown {
            command_id,
            sequence_number,
            ..
        } => {
            warn!(command_id = format_args!("{command_id:#010x}"), "unsupported PDU from SMSC");
            let nack = GenericNack::invalid_command_id(sequence_number);
            conn.write_frame(&Frame::GenericNack(nack)).await?;
        }
        Frame::BindTransceiver(_) | Frame::SubmitSm(_) => {
            let nack = GenericNack::error(frame.sequence_number(), CommandStatus::IncorrectBindStatus);
            warn!(pdu = frame.name(), "unexpected request from SMSC");
            conn.write_frame(&Frame::GenericNack(nack)).await?;
        }
        other => debug!(pdu = other.name(), "ignoring PDU"),
    }

    Ok(Inbound::Continue)
}

fn complete(pending: &mut HashMap<u32, Reply>, seq: u32, result: SmppResult<String>) {
    match pending.remove(&seq) {
        Some(reply) => {
            let _ = reply.send(result);
        }
        None => debug!(seq, "response for unknown or abandoned request"),
    }
}

/// Send unbind and wait a bounded time for unbind_resp.
async fn unbind(conn: &mut SmscConnection, sequence: &mut Sequence, wait: Duration) {
    let seq = sequence.next();
    if let Err(error) = conn.write_frame(&Frame::Unbind(Unbind::new(seq))).await {
        warn!(%error, "failed to send unbind");
        return;
    }

    let acknowledged = timeout(wait, async {
        loop {
            match conn.read_frame().await? {
                Some(Frame::UnbindResp(resp)) if resp.sequence_number == seq => return Ok(()),
                Some(other) => debug!(pdu = other.name(), "ignoring PDU while unbinding"),
                None => return Err(SmppError::ConnectionClosed),
            }
        }
    })
    .await;

    match acknowledged {
        Ok(Ok(())) => debug!("unbind acknowledged"),
        Ok(Err(error)) => warn!(%error, "unbind not acknowledged"),
        Err(_) => warn!(?wait, "no unbind_resp before timeout"),
    }
}
