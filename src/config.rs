// ABOUTME: Command-line flags and environment turned into one immutable gateway configuration
// ABOUTME: Rejects incomplete TLS settings up front instead of silently falling back

use crate::client::{
    BindCredentials, KeepAliveConfig, SmppResult, SmscTls, TransceiverConfig,
};
use crate::gateway::normalize_prefix;
use argh::FromArgs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the SMPP system id
pub const SMPP_USER: &str = "SMPP_USER";
/// Environment variable holding the SMPP password
pub const SMPP_PASSWD: &str = "SMPP_PASSWD";

pub const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

/// HTTP API for sending SMS via SMPP
#[derive(FromArgs, Debug)]
#[argh(note = "Environment variables:\n  SMPP_USER    username for the SMPP client connection\n  SMPP_PASSWD  password for the SMPP client connection")]
pub struct Args {
    /// host:port to listen on for http or https (default: :8080)
    #[argh(option, default = "String::from(\":8080\")")]
    pub http: String,

    /// prefix for http(s) endpoints
    #[argh(option, default = "String::new()")]
    pub prefix: String,

    /// public dir to serve for paths outside the api, optional
    #[argh(option)]
    pub public: Option<PathBuf>,

    /// log http requests
    #[argh(switch)]
    pub log: bool,

    /// add timestamp to logs (default: true)
    #[argh(option, default = "true")]
    pub log_timestamp: bool,

    /// x509 CA certificate file (for client auth)
    #[argh(option)]
    pub ca: Option<PathBuf>,

    /// x509 certificate file for https server
    #[argh(option)]
    pub cert: Option<PathBuf>,

    /// x509 key file for https server
    #[argh(option)]
    pub key: Option<PathBuf>,

    /// host:port of the SMSC to connect to via SMPP v3.4 (default: localhost:2775)
    #[argh(option, default = "String::from(\"localhost:2775\")")]
    pub smpp: String,

    /// connect to SMSC using TLS
    #[argh(switch)]
    pub tls: bool,

    /// disable TLS checks for client connection (dangerous)
    #[argh(switch)]
    pub precaire: bool,

    /// seconds to wait for the SMSC on each send, 0 waits forever (default: 30)
    #[argh(option, default = "30")]
    pub submit_timeout: u64,

    /// seconds between enquire_link keep-alives, 0 disables (default: 10)
    #[argh(option, default = "10")]
    pub enquire_link: u64,

    /// show version and exit
    #[argh(switch)]
    pub version: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("--cert and --key must be given together")]
    IncompleteServerTls,

    #[error("--ca requires --cert and --key")]
    ClientCaWithoutServerTls,

    #[error("--precaire only applies together with --tls")]
    InsecureWithoutTls,

    #[error("invalid listen address '{0}'")]
    InvalidListenAddress(String),

    #[error("invalid SMSC address '{0}'")]
    InvalidSmscAddress(String),
}

/// Certificate material for the HTTPS listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTlsFiles {
    pub cert: PathBuf,
    pub key: PathBuf,
    /// CA bundle for verifying client certificates. Enables mutual TLS.
    pub client_ca: Option<PathBuf>,
}

/// SMPP credentials as read from the environment
#[derive(Clone, Default)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            user: std::env::var(SMPP_USER).unwrap_or_default(),
            password: std::env::var(SMPP_PASSWD).unwrap_or_default(),
        }
    }
}

/// Everything the process needs, fixed at startup
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub listen: String,
    pub prefix: String,
    pub public_dir: Option<PathBuf>,
    pub access_log: bool,
    pub log_timestamp: bool,
    pub server_tls: Option<ServerTlsFiles>,
    pub smpp_addr: String,
    pub credentials: BindCredentials,
    pub smsc_tls: bool,
    pub smsc_insecure: bool,
    /// `None` waits as long as the session does
    pub submit_timeout: Option<Duration>,
    pub enquire_link: Duration,
}

impl GatewayConfig {
    pub fn from_args(args: Args, credentials: Credentials) -> Result<Self, ConfigError> {
        let server_tls = match (args.cert, args.key, args.ca) {
            (Some(cert), Some(key), client_ca) => Some(ServerTlsFiles {
                cert,
                key,
                client_ca,
            }),
            (None, None, None) => None,
            (None, None, Some(_)) => return Err(ConfigError::ClientCaWithoutServerTls),
            _ => return Err(ConfigError::IncompleteServerTls),
        };

        if args.precaire && !args.tls {
            return Err(ConfigError::InsecureWithoutTls);
        }

        let smpp_addr = args.smpp.trim().to_string();
        if !smpp_addr.contains(':') {
            return Err(ConfigError::InvalidSmscAddress(smpp_addr));
        }

        Ok(Self {
            listen: listen_address(&args.http)?,
            prefix: normalize_prefix(&args.prefix),
            public_dir: args.public,
            access_log: args.log,
            log_timestamp: args.log_timestamp,
            server_tls,
            smpp_addr,
            credentials: BindCredentials::new(credentials.user, credentials.password),
            smsc_tls: args.tls,
            smsc_insecure: args.precaire,
            submit_timeout: (args.submit_timeout > 0)
                .then(|| Duration::from_secs(args.submit_timeout)),
            enquire_link: Duration::from_secs(args.enquire_link),
        })
    }

    /// Session settings for the configured SMSC
    pub fn transceiver_config(&self) -> SmppResult<TransceiverConfig> {
        let mut config = TransceiverConfig::new(&self.smpp_addr, self.credentials.clone())
            .with_keepalive(KeepAliveConfig::new(self.enquire_link));

        if self.smsc_tls {
            config = config.with_tls(SmscTls::new(&self.smpp_addr, self.smsc_insecure)?);
        }

        Ok(config)
    }
}

/// `:8080` listens on every interface, like the Go style address it mirrors.
fn listen_address(http: &str) -> Result<String, ConfigError> {
    let http = http.trim();
    match http.rsplit_once(':') {
        Some((_, port)) if port.parse::<u16>().is_err() => {
            Err(ConfigError::InvalidListenAddress(http.to_string()))
        }
        Some(("", port)) => Ok(format!("0.0.0.0:{port}")),
        Some(_) => Ok(http.to_string()),
        None => Err(ConfigError::InvalidListenAddress(http.to_string())),
    }
}
