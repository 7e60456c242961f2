// ABOUTME: Supporting types for the transceiver: bind credentials and outgoing messages
// ABOUTME: SmsMessage is what the HTTP layer hands to the session

use crate::datatypes::SubmitSm;

/// SMPP bind_transceiver credentials
#[derive(Clone, Default)]
pub struct BindCredentials {
    pub system_id: String,
    pub password: String,
}

impl BindCredentials {
    pub fn new(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
            password: password.into(),
        }
    }
}

// Keep the password out of logs
impl std::fmt::Debug for BindCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindCredentials")
            .field("system_id", &self.system_id)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A text message to submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsMessage {
    /// Destination address
    pub to: String,
    /// Source address, empty to let the SMSC pick the default
    pub from: String,
    /// Message body
    pub text: String,
    /// Request an SMSC delivery receipt
    pub register: bool,
}

impl SmsMessage {
    pub fn new(to: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            from: String::new(),
            text: text.into(),
            register: false,
        }
    }

    pub fn with_source(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    pub fn with_delivery_receipt(mut self, register: bool) -> Self {
        self.register = register;
        self
    }

    /// The submit_sm carrying this message
    pub fn to_submit_sm(&self, sequence_number: u32) -> SubmitSm {
        SubmitSm::new(
            sequence_number,
            &self.from,
            &self.to,
            &self.text,
            self.register,
        )
    }
}
