// ABOUTME: SMPP transceiver session used by the HTTP gateway
// ABOUTME: Exports the session trait, the tokio-backed transceiver, status events and TLS setup

//! SMPP Client Module
//!
//! The gateway talks to the SMSC through one long-lived [`Transceiver`]:
//!
//! * **Background task** - connect, TLS, bind and reconnect happen off the
//!   request path; callers only see [`SmppSession::submit`]
//! * **Status events** - every link transition is reported as a
//!   [`ConnStatusEvent`] on an ordered channel
//! * **Keep-alive** - periodic enquire_link detects dead links
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sms_api_server::client::{
//!     BindCredentials, SmppSession, SmsMessage, Transceiver, TransceiverConfig,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TransceiverConfig::new("localhost:2775", BindCredentials::new("esme", "secret"));
//! let session = Transceiver::start(config);
//!
//! let message_id = session.submit(SmsMessage::new("+15551234567", "Hello!")).await?;
//! println!("submitted as {message_id}");
//!
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod keepalive;
mod status;
mod tls;
mod traits;
mod transceiver;
mod types;

pub use error::{SmppError, SmppResult};
pub use keepalive::{KeepAliveConfig, KeepAliveManager};
pub use status::{ConnStatus, ConnStatusEvent, StatusEvents, StatusSender};
pub use tls::{server_name_for, SmscTls};
pub use traits::SmppSession;
pub use transceiver::{ReconnectPolicy, Transceiver, TransceiverConfig};
pub use types::{BindCredentials, SmsMessage};
