use crate::datatypes::{CommandId, CommandStatus};
use crate::macros::impl_header_only_pdu;

/// unbind deregisters the ESME and asks the peer to close the session
/// (section 4.2).
#[derive(Clone, Debug, PartialEq)]
pub struct Unbind {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnbindResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_header_only_pdu!(Unbind, CommandId::Unbind);
impl_header_only_pdu!(UnbindResponse, CommandId::UnbindResp);
