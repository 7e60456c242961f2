use crate::datatypes::{CommandId, CommandStatus};
use crate::macros::impl_header_only_pdu;

/// enquire_link checks that the peer is still alive. Either side may send it
/// once bound (section 4.11).
#[derive(Clone, Debug, PartialEq)]
pub struct EnquireLink {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnquireLinkResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_header_only_pdu!(EnquireLink, CommandId::EnquireLink);
impl_header_only_pdu!(EnquireLinkResponse, CommandId::EnquireLinkResp);
