use crate::codec::{CodecError, Decodable, Encodable, PduHeader};
use crate::datatypes::short_message::decode_text;
use crate::datatypes::{CommandId, CommandStatus, NumericPlanIndicator, TypeOfNumber};
use crate::macros::impl_short_message_pdu;
use bytes::{Buf, Bytes, BytesMut};
use std::io::Cursor;

/// esm_class message type bits marking an SMSC delivery receipt
const ESM_CLASS_TYPE_MASK: u8 = 0b0011_1100;
const ESM_CLASS_DELIVERY_RECEIPT: u8 = 0b0000_0100;

/// deliver_sm is sent by the SMSC to deliver a mobile originated message or
/// a delivery receipt to the ESME (section 4.6). It shares the submit_sm
/// body layout.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub service_type: String,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub source_addr: String,
    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,
    pub destination_addr: String,
    pub esm_class: u8,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub data_coding: u8,
    pub sm_default_msg_id: u8,
    pub short_message: Bytes,
}

impl DeliverSm {
    pub fn new(sequence_number: u32, source_addr: &str, destination_addr: &str, text: &str) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            service_type: String::new(),
            source_addr_ton: TypeOfNumber::Unknown,
            source_addr_npi: NumericPlanIndicator::Unknown,
            source_addr: source_addr.to_string(),
            dest_addr_ton: TypeOfNumber::Unknown,
            dest_addr_npi: NumericPlanIndicator::Unknown,
            destination_addr: destination_addr.to_string(),
            esm_class: 0,
            protocol_id: 0,
            priority_flag: 0,
            schedule_delivery_time: String::new(),
            validity_period: String::new(),
            registered_delivery: 0,
            replace_if_present_flag: 0,
            data_coding: 0,
            sm_default_msg_id: 0,
            short_message: Bytes::copy_from_slice(text.as_bytes()),
        }
    }

    pub fn is_delivery_receipt(&self) -> bool {
        self.esm_class & ESM_CLASS_TYPE_MASK == ESM_CLASS_DELIVERY_RECEIPT
    }

    /// The short message decoded according to its data_coding
    pub fn text(&self) -> String {
        decode_text(self.data_coding, &self.short_message)
    }
}

impl_short_message_pdu!(DeliverSm, CommandId::DeliverSm);

/// deliver_sm_resp: the message_id field is unused and always empty.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl DeliverSmResponse {
    pub fn new(sequence_number: u32) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
        }
    }
}

impl Encodable for DeliverSmResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::placeholder(
            CommandId::DeliverSmResp,
            self.command_status,
            self.sequence_number,
        )
        .encode(buf);
        crate::codec::encode_cstring(buf, "", 1, "message_id")
    }
}

impl Decodable for DeliverSmResponse {
    fn command_id() -> CommandId {
        CommandId::DeliverSmResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;
        buf.advance(buf.remaining());

        Ok(Self {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
        })
    }
}
