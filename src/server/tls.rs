// ABOUTME: Loads PEM certificate material and builds the HTTPS listener's rustls config
// ABOUTME: A client CA turns on mandatory client certificate verification

use crate::config::ServerTlsFiles;
use crate::server::ServerError;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Build the listener's TLS config from the files on disk.
pub fn server_config(files: &ServerTlsFiles) -> Result<Arc<ServerConfig>, ServerError> {
    info!(cert = %files.cert.display(), "loading server certificate");
    let certs = load_certs(&files.cert)?;
    let key = load_private_key(&files.key)?;

    let client_ca = match &files.client_ca {
        Some(path) => {
            info!(ca = %path.display(), "client certificates required");
            Some(load_certs(path)?)
        }
        None => None,
    };

    build_server_config(certs, key, client_ca)
}

/// TLS config for `certs` and `key`. With `client_ca` every client must
/// present a certificate chaining to one of those roots.
pub fn build_server_config(
    certs: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    client_ca: Option<Vec<CertificateDer<'static>>>,
) -> Result<Arc<ServerConfig>, ServerError> {
    let provider = provider();
    let builder = ServerConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?;

    let builder = match client_ca {
        Some(ca_certs) => {
            let mut roots = RootCertStore::empty();
            let (added, ignored) = roots.add_parsable_certificates(ca_certs);
            debug!(added, ignored, "loaded client CA certificates");
            if added == 0 {
                return Err(ServerError::TlsMaterial {
                    path: "client CA".to_string(),
                    reason: "no usable CA certificates".to_string(),
                });
            }

            let verifier =
                WebPkiClientVerifier::builder_with_provider(Arc::new(roots), provider).build()?;
            builder.with_client_cert_verifier(verifier)
        }
        None => builder.with_no_client_auth(),
    };

    let mut config = builder.with_single_cert(certs, key)?;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    Ok(Arc::new(config))
}

/// Every certificate in a PEM file, leaf first
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ServerError> {
    let pem = read(path)?;
    parse_certs(&mut pem.as_slice()).map_err(|reason| ServerError::TlsMaterial {
        path: path.display().to_string(),
        reason,
    })
}

/// The first private key in a PEM file (PKCS#8, PKCS#1 or SEC1)
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, ServerError> {
    let pem = read(path)?;
    parse_private_key(&mut pem.as_slice()).map_err(|reason| ServerError::TlsMaterial {
        path: path.display().to_string(),
        reason,
    })
}

fn read(path: &Path) -> Result<Vec<u8>, ServerError> {
    std::fs::read(path).map_err(|error| ServerError::TlsMaterial {
        path: path.display().to_string(),
        reason: error.to_string(),
    })
}

fn parse_certs(reader: &mut dyn BufRead) -> Result<Vec<CertificateDer<'static>>, String> {
    let certs = rustls_pemfile::certs(reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| error.to_string())?;

    if certs.is_empty() {
        return Err("no certificates found".to_string());
    }
    Ok(certs)
}

fn parse_private_key(reader: &mut dyn BufRead) -> Result<PrivateKeyDer<'static>, String> {
    rustls_pemfile::private_key(reader)
        .map_err(|error| error.to_string())?
        .ok_or_else(|| "no private key found".to_string())
}
