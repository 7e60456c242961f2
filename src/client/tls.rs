// ABOUTME: TLS transport to the SMSC using rustls with the ring provider
// ABOUTME: Verifies against the platform trust store unless insecure mode is requested

use crate::client::error::{SmppError, SmppResult};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

/// TLS settings for the SMSC link
#[derive(Clone)]
pub struct SmscTls {
    config: Arc<ClientConfig>,
    server_name: ServerName<'static>,
}

impl std::fmt::Debug for SmscTls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmscTls")
            .field("server_name", &self.server_name)
            .finish_non_exhaustive()
    }
}

impl SmscTls {
    /// TLS for `address`, verifying the SMSC certificate against the
    /// platform trust store, or not at all when `insecure` is set.
    pub fn new(address: &str, insecure: bool) -> SmppResult<Self> {
        let server_name = server_name_for(address)?;
        let config = if insecure {
            warn!(address, "SMSC certificate verification is disabled");
            insecure_client_config()?
        } else {
            client_config(native_roots())?
        };

        Ok(Self {
            config: Arc::new(config),
            server_name,
        })
    }

    /// TLS trusting only `roots`
    pub fn with_roots(address: &str, roots: RootCertStore) -> SmppResult<Self> {
        Ok(Self {
            config: Arc::new(client_config(roots)?),
            server_name: server_name_for(address)?,
        })
    }

    pub fn server_name(&self) -> &ServerName<'static> {
        &self.server_name
    }

    /// Run the TLS handshake over an established TCP connection.
    pub async fn connect(&self, stream: TcpStream) -> SmppResult<TlsStream<TcpStream>> {
        let connector = TlsConnector::from(self.config.clone());
        let tls = connector
            .connect(self.server_name.clone(), stream)
            .await?;
        Ok(tls)
    }
}

/// The TLS server name for an SMSC address: the host with the port and any
/// IPv6 brackets removed.
pub fn server_name_for(address: &str) -> SmppResult<ServerName<'static>> {
    let host = host_of(address);
    if host.is_empty() {
        return Err(SmppError::InvalidAddress(address.to_string()));
    }

    ServerName::try_from(host.to_string())
        .map_err(|_| SmppError::InvalidAddress(address.to_string()))
}

fn host_of(address: &str) -> &str {
    if let Some(rest) = address.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }

    match address.rsplit_once(':') {
        // A bare IPv6 address has more than one colon and no port
        Some((host, _)) if !host.contains(':') => host,
        Some(_) => address,
        None => address,
    }
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

fn client_config(roots: RootCertStore) -> SmppResult<ClientConfig> {
    Ok(ClientConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth())
}

fn insecure_client_config() -> SmppResult<ClientConfig> {
    let provider = provider();
    Ok(ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert(provider)))
        .with_no_client_auth())
}

fn native_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for error in &native.errors {
        warn!(%error, "failed to load a platform root certificate");
    }

    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    debug!(added, ignored, "loaded platform root certificates");
    roots
}

/// Accepts any server certificate and name. Handshake signatures are still
/// checked so the session keys belong to whoever holds the presented key.
#[derive(Debug)]
struct AcceptAnyServerCert(Arc<CryptoProvider>);

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_is_extracted_from_address() {
        assert_eq!(host_of("smsc.example.com:2775"), "smsc.example.com");
        assert_eq!(host_of("smsc.example.com"), "smsc.example.com");
        assert_eq!(host_of("[::1]:2775"), "::1");
        assert_eq!(host_of("::1"), "::1");
        assert_eq!(host_of("10.0.0.1:2775"), "10.0.0.1");
    }

    #[test]
    fn server_names() {
        assert_eq!(
            server_name_for("smsc.example.com:2775").unwrap(),
            ServerName::try_from("smsc.example.com").unwrap()
        );
        assert!(matches!(
            server_name_for("[::1]:2775").unwrap(),
            ServerName::IpAddress(_)
        ));
        assert!(matches!(
            server_name_for(":2775"),
            Err(SmppError::InvalidAddress(_))
        ));
    }

    #[test]
    fn insecure_settings_build() {
        let tls = SmscTls::new("localhost:2775", true).unwrap();
        assert_eq!(
            tls.server_name(),
            &ServerName::try_from("localhost").unwrap()
        );
    }
}
