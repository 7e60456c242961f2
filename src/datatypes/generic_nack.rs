use crate::datatypes::{CommandId, CommandStatus};
use crate::macros::impl_header_only_pdu;

/// generic_nack answers a PDU that could not be processed at all, such as
/// one with an unknown command_id or a corrupt body.
///
/// The sequence_number echoes the offending PDU, or 0 when it could not be
/// read.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericNack {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_header_only_pdu!(GenericNack, CommandId::GenericNack);

impl GenericNack {
    pub fn invalid_command_id(sequence_number: u32) -> Self {
        Self::error(sequence_number, CommandStatus::InvalidCommandId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Encodable, Frame};
    use std::io::Cursor;

    #[test]
    fn generic_nack_with_unknown_sequence_parses() {
        let bytes = GenericNack::error(0, CommandStatus::InvalidCommandLength)
            .to_bytes()
            .unwrap();

        match Frame::parse(&mut Cursor::new(bytes.as_ref())).unwrap() {
            Frame::GenericNack(nack) => {
                assert_eq!(nack.sequence_number, 0);
                assert_eq!(nack.command_status, CommandStatus::InvalidCommandLength);
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }
}
