// ABOUTME: Shared fixtures for integration tests: a scriptable fake SMSC, a fake session and certificates
// ABOUTME: The fake SMSC speaks real SMPP through the crate's own codec

#![allow(dead_code)]

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use sms_api_server::client::{SmppError, SmppResult, SmppSession, StatusEvents, StatusSender};
use sms_api_server::connection::Connection;
use sms_api_server::datatypes::{
    BindTransceiverResponse, CommandStatus, DeliverSm, EnquireLinkResponse, GenericNack,
    SubmitSm, SubmitSmResponse, Unbind, UnbindResponse,
};
use sms_api_server::{ConnStatus, Frame, SmsMessage};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

/// Sequence numbers for requests the fake SMSC originates
const SMSC_SEQUENCE: u32 = 0x4000_0000;

/// How the fake SMSC deviates from a well-behaved one
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Answer every submit_sm_resp with this command_status
    pub submit_status: Option<CommandStatus>,
    /// Answer submit_sm with generic_nack instead of submit_sm_resp
    pub nack_submits: bool,
    /// Push a deliver_sm right after each bind
    pub deliver_after_bind: bool,
    /// Ask the first bound client to unbind
    pub unbind_after_first_bind: bool,
    /// Leave enquire_link unanswered
    pub ignore_enquire_link: bool,
}

#[derive(Default)]
struct Record {
    submits: Mutex<Vec<SubmitSm>>,
    received: Mutex<Vec<&'static str>>,
    binds: AtomicUsize,
}

/// An SMSC that accepts any bind, answers keep-alives and records every
/// PDU it receives. Submits get message ids `msg-1`, `msg-2` and so on.
pub struct FakeSmsc {
    addr: SocketAddr,
    record: Arc<Record>,
    task: JoinHandle<()>,
}

impl FakeSmsc {
    pub async fn start() -> Self {
        Self::scripted(Script::default()).await
    }

    pub async fn scripted(script: Script) -> Self {
        Self::spawn(script, None).await
    }

    /// An SMSC behind TLS with a throwaway self-signed certificate
    pub async fn start_tls() -> Self {
        let (certs, key) = self_signed("localhost");
        let config = sms_api_server::server::build_server_config(certs, key, None).unwrap();
        Self::spawn(Script::default(), Some(TlsAcceptor::from(config))).await
    }

    async fn spawn(script: Script, acceptor: Option<TlsAcceptor>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let record = Arc::new(Record::default());

        let task = tokio::spawn({
            let record = record.clone();
            async move {
                loop {
                    let Ok((stream, _)) = listener.accept().await else {
                        return;
                    };
                    let record = record.clone();
                    let script = script.clone();
                    match &acceptor {
                        Some(acceptor) => {
                            let acceptor = acceptor.clone();
                            tokio::spawn(async move {
                                if let Ok(tls) = acceptor.accept(stream).await {
                                    serve(Connection::new(tls), script, record).await;
                                }
                            });
                        }
                        None => {
                            tokio::spawn(serve(Connection::new(stream), script, record));
                        }
                    }
                }
            }
        });

        Self { addr, record, task }
    }

    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    pub fn submits(&self) -> Vec<SubmitSm> {
        self.record.submits.lock().unwrap().clone()
    }

    pub fn binds(&self) -> usize {
        self.record.binds.load(Ordering::SeqCst)
    }

    /// Names of every PDU received so far, in arrival order
    pub fn received(&self) -> Vec<&'static str> {
        self.record.received.lock().unwrap().clone()
    }

    pub fn has_received(&self, pdu: &str) -> bool {
        self.record.received.lock().unwrap().contains(&pdu)
    }
}

impl Drop for FakeSmsc {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve<S: AsyncRead + AsyncWrite + Unpin>(
    mut conn: Connection<S>,
    script: Script,
    record: Arc<Record>,
) {
    while let Ok(Some(frame)) = conn.read_frame().await {
        record.received.lock().unwrap().push(frame.name());
        let seq = frame.sequence_number();
        let mut replies = Vec::new();

        match frame {
            Frame::BindTransceiver(_) => {
                let binds = record.binds.fetch_add(1, Ordering::SeqCst) + 1;
                replies.push(Frame::BindTransceiverResp(BindTransceiverResponse::new(
                    seq,
                    "fake-smsc",
                )));
                if script.deliver_after_bind {
                    replies.push(Frame::DeliverSm(Box::new(DeliverSm::new(
                        SMSC_SEQUENCE,
                        "+15557654321",
                        "ACME",
                        "reply",
                    ))));
                }
                if script.unbind_after_first_bind && binds == 1 {
                    replies.push(Frame::Unbind(Unbind::new(SMSC_SEQUENCE + 1)));
                }
            }
            Frame::SubmitSm(submit) => {
                let count = {
                    let mut submits = record.submits.lock().unwrap();
                    submits.push(*submit);
                    submits.len()
                };
                let reply = if script.nack_submits {
                    Frame::GenericNack(GenericNack::error(seq, CommandStatus::SystemError))
                } else {
                    match script.submit_status {
                        Some(status) => Frame::SubmitSmResp(SubmitSmResponse::error(seq, status)),
                        None => Frame::SubmitSmResp(SubmitSmResponse::new(
                            seq,
                            &format!("msg-{count}"),
                        )),
                    }
                };
                replies.push(reply);
            }
            Frame::EnquireLink(_) if !script.ignore_enquire_link => {
                replies.push(Frame::EnquireLinkResp(EnquireLinkResponse::new(seq)));
            }
            Frame::Unbind(_) => {
                let _ = conn
                    .write_frame(&Frame::UnbindResp(UnbindResponse::new(seq)))
                    .await;
                return;
            }
            // The client acknowledged an unbind we asked for
            Frame::UnbindResp(_) => return,
            _ => {}
        }

        for reply in &replies {
            if conn.write_frame(reply).await.is_err() {
                return;
            }
        }
    }
}

pub type Outcome = fn(&SmsMessage) -> SmppResult<String>;

/// A session that records submits and answers them from a fixed function
pub struct FakeSession {
    outcome: Option<Outcome>,
    submits: Mutex<Vec<SmsMessage>>,
    closes: AtomicUsize,
    events: Mutex<Option<StatusEvents>>,
    status: Mutex<Option<StatusSender>>,
}

impl FakeSession {
    pub fn replying(outcome: Outcome) -> Arc<Self> {
        Arc::new(Self::new(Some(outcome)))
    }

    pub fn accepting() -> Arc<Self> {
        Self::replying(|_| Ok("fake-1".to_string()))
    }

    /// Submits never complete
    pub fn hanging() -> Arc<Self> {
        Arc::new(Self::new(None))
    }

    fn new(outcome: Option<Outcome>) -> Self {
        let (status, events) = StatusSender::channel();
        status.status(ConnStatus::Connecting);
        status.status(ConnStatus::Bound);
        Self {
            outcome,
            submits: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
            events: Mutex::new(Some(events)),
            status: Mutex::new(Some(status)),
        }
    }

    pub fn submits(&self) -> Vec<SmsMessage> {
        self.submits.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl SmppSession for FakeSession {
    async fn submit(&self, message: SmsMessage) -> SmppResult<String> {
        self.submits.lock().unwrap().push(message.clone());
        match self.outcome {
            Some(outcome) => outcome(&message),
            None => std::future::pending().await,
        }
    }

    fn status_events(&self) -> Option<StatusEvents> {
        self.events.lock().unwrap().take()
    }

    async fn close(&self) -> SmppResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.status.lock().unwrap().take() {
            status.status(ConnStatus::Closed);
        }
        Ok(())
    }

    fn addr(&self) -> &str {
        "fake-smsc:2775"
    }
}

pub fn not_bound(_: &SmsMessage) -> SmppResult<String> {
    Err(SmppError::NotBound)
}

/// Poll `condition` every 10ms until it holds or `limit` passes.
pub async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// A self-signed certificate and key for `name`
pub fn self_signed(name: &str) -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
    let certified = rcgen::generate_simple_self_signed(vec![name.to_string()]).unwrap();
    (
        vec![certified.cert.der().clone()],
        PrivateKeyDer::Pkcs8(certified.key_pair.serialize_der().into()),
    )
}

/// A self-signed certificate and key for `name`, as one PEM bundle
pub fn self_signed_pem(name: &str) -> String {
    let certified = rcgen::generate_simple_self_signed(vec![name.to_string()]).unwrap();
    format!(
        "{}{}",
        certified.cert.pem(),
        certified.key_pair.serialize_pem()
    )
}

/// A throwaway certificate authority able to issue server and client certs
pub struct TestCa {
    cert: Certificate,
    key: KeyPair,
}

impl TestCa {
    pub fn new() -> Self {
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
            KeyUsagePurpose::DigitalSignature,
        ];
        let key = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key).unwrap();
        Self { cert, key }
    }

    pub fn cert(&self) -> CertificateDer<'static> {
        self.cert.der().clone()
    }

    fn sign(&self, name: &str, usage: ExtendedKeyUsagePurpose) -> (Certificate, KeyPair) {
        let mut params = CertificateParams::new(vec![name.to_string()]).unwrap();
        params.extended_key_usages = vec![usage];
        let key = KeyPair::generate().unwrap();
        let cert = params.signed_by(&key, &self.cert, &self.key).unwrap();
        (cert, key)
    }

    pub fn issue(
        &self,
        name: &str,
        usage: ExtendedKeyUsagePurpose,
    ) -> (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>) {
        let (cert, key) = self.sign(name, usage);
        (
            vec![cert.der().clone()],
            PrivateKeyDer::Pkcs8(key.serialize_der().into()),
        )
    }

    /// A client certificate and key as one PEM bundle
    pub fn issue_client_pem(&self, name: &str) -> String {
        let (cert, key) = self.sign(name, ExtendedKeyUsagePurpose::ClientAuth);
        format!("{}{}", cert.pem(), key.serialize_pem())
    }
}
