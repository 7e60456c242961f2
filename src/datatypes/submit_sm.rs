use crate::codec::{decode_cstring, CodecError, Decodable, Encodable, PduHeader};
use crate::datatypes::short_message::{encode_text, DELIVERY_RECEIPT_REQUESTED};
use crate::datatypes::{CommandId, CommandStatus, NumericPlanIndicator, TypeOfNumber};
use crate::macros::impl_short_message_pdu;
use bytes::{Buf, Bytes, BytesMut};
use std::io::Cursor;

const MESSAGE_ID_SIZE: usize = 65;

/// submit_sm hands a short message to the SMSC for onward delivery to a
/// single destination (section 4.4).
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// 5.2.11 service_type: empty for the SMSC default
    pub service_type: String,

    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,

    /// 5.2.8 source_addr: originator, empty to let the SMSC fill it in
    pub source_addr: String,

    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,

    /// 5.2.9 destination_addr: the recipient's number
    pub destination_addr: String,

    /// 5.2.12 esm_class: message mode and type, 0 for default
    pub esm_class: u8,

    pub protocol_id: u8,
    pub priority_flag: u8,

    /// 5.2.15 schedule_delivery_time: empty for immediate delivery
    pub schedule_delivery_time: String,

    /// 5.2.16 validity_period: empty for the SMSC default
    pub validity_period: String,

    /// 5.2.17 registered_delivery: bit 0 requests a delivery receipt
    pub registered_delivery: u8,

    pub replace_if_present_flag: u8,

    /// 5.2.19 data_coding of `short_message`
    pub data_coding: u8,

    pub sm_default_msg_id: u8,

    /// 5.2.22 short_message: up to 254 octets of user data
    pub short_message: Bytes,
}

impl SubmitSm {
    /// Build a submit_sm for `text`, choosing the data_coding and address
    /// types from the content.
    pub fn new(
        sequence_number: u32,
        source_addr: &str,
        destination_addr: &str,
        text: &str,
        register: bool,
    ) -> Self {
        let (data_coding, short_message) = encode_text(text);

        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            service_type: String::new(),
            source_addr_ton: TypeOfNumber::for_address(source_addr),
            source_addr_npi: npi_for(source_addr),
            source_addr: source_addr.to_string(),
            dest_addr_ton: TypeOfNumber::for_address(destination_addr),
            dest_addr_npi: npi_for(destination_addr),
            destination_addr: destination_addr.to_string(),
            esm_class: 0,
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: if register {
                DELIVERY_RECEIPT_REQUESTED
            } else {
                0
            },
            replace_if_present_flag: 0,
            data_coding,
            sm_default_msg_id: 0,
            short_message: Bytes::from(short_message),
        }
    }
}

fn npi_for(address: &str) -> NumericPlanIndicator {
    match TypeOfNumber::for_address(address) {
        TypeOfNumber::International => NumericPlanIndicator::Isdn,
        _ => NumericPlanIndicator::Unknown,
    }
}

impl_short_message_pdu!(SubmitSm, CommandId::SubmitSm);

/// submit_sm_resp carries the SMSC assigned message id on success.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// 5.2.23 message_id
    pub message_id: String,
}

impl SubmitSmResponse {
    pub fn new(sequence_number: u32, message_id: &str) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            message_id: message_id.to_string(),
        }
    }

    pub fn error(sequence_number: u32, command_status: CommandStatus) -> Self {
        Self {
            command_status,
            sequence_number,
            message_id: String::new(),
        }
    }
}

impl Encodable for SubmitSmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::placeholder(
            CommandId::SubmitSmResp,
            self.command_status,
            self.sequence_number,
        )
        .encode(buf);

        // An error response has no body (section 4.4.2)
        if self.command_status == CommandStatus::Ok {
            crate::codec::encode_cstring(buf, &self.message_id, MESSAGE_ID_SIZE, "message_id")?;
        }
        Ok(())
    }
}

impl Decodable for SubmitSmResponse {
    fn command_id() -> CommandId {
        CommandId::SubmitSmResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let message_id = if buf.has_remaining() {
            decode_cstring(buf, MESSAGE_ID_SIZE, "message_id")?
        } else {
            String::new()
        };

        Ok(Self {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            message_id,
        })
    }
}
