// ABOUTME: HTTP API for sending SMS through a persistent SMPP transceiver session
// ABOUTME: Wire codec and session at the bottom, HTTP gateway and process lifecycle on top

//! # sms-api-server
//!
//! `POST <prefix>/send` with a destination and a body becomes one
//! `submit_sm` on a long-lived SMPP v3.4 transceiver session, and the
//! SMSC's message id comes back as JSON.
//!
//! * [`codec`], [`datatypes`] and [`connection`] frame the PDUs a
//!   transceiver needs
//! * [`client`] runs the session: bind, keep-alive, reconnects and status
//!   events
//! * [`gateway`] holds the HTTP routes and the connection monitor
//! * [`server`] and [`config`] wire everything into a process

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod datatypes;
pub mod gateway;
pub mod server;

mod macros;

pub use codec::{CodecError, Decodable, Encodable, Frame, PduHeader, PduRegistry};
pub use datatypes::{CommandId, CommandStatus};

pub use client::{
    BindCredentials, ConnStatus, ConnStatusEvent, SmppError, SmppResult, SmppSession, SmsMessage,
    Transceiver, TransceiverConfig,
};
pub use gateway::{Gateway, GatewayError};
