// ABOUTME: The HTTP listener: plain axum serving or a rustls accept loop feeding hyper
// ABOUTME: Handshake failures (including missing client certificates) never reach the router

use crate::server::ServerError;
use axum::extract::ConnectInfo;
use axum::{Extension, Router};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use rustls::ServerConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// A bound HTTP or HTTPS socket, ready to serve a router
pub struct HttpListener {
    listener: TcpListener,
    acceptor: Option<TlsAcceptor>,
}

impl HttpListener {
    /// Bind `address`. With `tls` set, connections are served over TLS.
    pub async fn bind(address: &str, tls: Option<Arc<ServerConfig>>) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.to_string(),
                source,
            })?;

        Ok(Self {
            listener,
            acceptor: tls.map(TlsAcceptor::from),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn is_tls(&self) -> bool {
        self.acceptor.is_some()
    }

    /// Serve `app` until the future is dropped or the socket fails.
    pub async fn serve(self, app: Router) -> Result<(), ServerError> {
        let address = self.local_addr()?;
        info!(%address, tls = self.is_tls(), "HTTP listener started");

        match self.acceptor {
            None => {
                axum::serve(
                    self.listener,
                    app.into_make_service_with_connect_info::<SocketAddr>(),
                )
                .await?;
                Ok(())
            }
            Some(acceptor) => serve_tls(self.listener, acceptor, app).await,
        }
    }
}

async fn serve_tls(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    app: Router,
) -> Result<(), ServerError> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(error) => {
                // Typically out of file descriptors; back off instead of spinning
                error!(%error, "accept error");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        tokio::spawn(serve_tls_connection(
            stream,
            peer,
            acceptor.clone(),
            app.clone(),
        ));
    }
}

async fn serve_tls_connection(
    stream: TcpStream,
    peer: SocketAddr,
    acceptor: TlsAcceptor,
    app: Router,
) {
    let tls = match tokio::time::timeout(HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await {
        Ok(Ok(tls)) => tls,
        Ok(Err(error)) => {
            debug!(%peer, %error, "TLS handshake failed");
            return;
        }
        Err(_) => {
            debug!(%peer, "TLS handshake timed out");
            return;
        }
    };

    let service = TowerToHyperService::new(app.layer(Extension(ConnectInfo(peer))));
    if let Err(error) = auto::Builder::new(TokioExecutor::new())
        .serve_connection_with_upgrades(TokioIo::new(tls), service)
        .await
    {
        debug!(%peer, %error, "connection closed with error");
    }
}
