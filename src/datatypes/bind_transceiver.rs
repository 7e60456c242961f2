use crate::codec::{
    decode_cstring, decode_u8, encode_cstring, CodecError, Decodable, Encodable, PduHeader,
};
use crate::datatypes::{
    CommandId, CommandStatus, InterfaceVersion, NumericPlanIndicator, TypeOfNumber,
};
use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;

// Field sizes including the null terminator
const SYSTEM_ID_SIZE: usize = 16;
const PASSWORD_SIZE: usize = 9;
const SYSTEM_TYPE_SIZE: usize = 13;
const ADDRESS_RANGE_SIZE: usize = 41;

/// BindTransceiver binds an ESME that both submits and receives messages over
/// a single connection.
#[derive(Clone, Debug, PartialEq)]
pub struct BindTransceiver {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// 5.2.1 system_id: identifies the ESME to the SMSC. Up to 15 characters.
    pub system_id: String,

    /// 5.2.2 password: up to 8 characters. Empty when the SMSC requires none.
    pub password: String,

    /// 5.2.3 system_type: categorizes the ESME, e.g. "VMS" or "OTA".
    pub system_type: String,

    /// 5.2.4 interface_version
    pub interface_version: InterfaceVersion,

    /// 5.2.5 addr_ton of the address range served by this ESME
    pub addr_ton: TypeOfNumber,

    /// 5.2.6 addr_npi of the address range served by this ESME
    pub addr_npi: NumericPlanIndicator,

    /// 5.2.7 address_range: a range of SME addresses, or empty for any.
    pub address_range: String,
}

impl BindTransceiver {
    pub fn new(sequence_number: u32, system_id: &str, password: &str) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id: system_id.to_string(),
            password: password.to_string(),
            system_type: String::new(),
            interface_version: InterfaceVersion::SmppV34,
            addr_ton: TypeOfNumber::Unknown,
            addr_npi: NumericPlanIndicator::Unknown,
            address_range: String::new(),
        }
    }
}

impl Encodable for BindTransceiver {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::placeholder(
            CommandId::BindTransceiver,
            self.command_status,
            self.sequence_number,
        )
        .encode(buf);

        encode_cstring(buf, &self.system_id, SYSTEM_ID_SIZE, "system_id")?;
        encode_cstring(buf, &self.password, PASSWORD_SIZE, "password")?;
        encode_cstring(buf, &self.system_type, SYSTEM_TYPE_SIZE, "system_type")?;
        buf.put_u8(self.interface_version as u8);
        buf.put_u8(self.addr_ton as u8);
        buf.put_u8(self.addr_npi as u8);
        encode_cstring(buf, &self.address_range, ADDRESS_RANGE_SIZE, "address_range")?;

        Ok(())
    }
}

impl Decodable for BindTransceiver {
    fn command_id() -> CommandId {
        CommandId::BindTransceiver
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let system_id = decode_cstring(buf, SYSTEM_ID_SIZE, "system_id")?;
        let password = decode_cstring(buf, PASSWORD_SIZE, "password")?;
        let system_type = decode_cstring(buf, SYSTEM_TYPE_SIZE, "system_type")?;

        let version = decode_u8(buf)?;
        let interface_version =
            InterfaceVersion::try_from(version).map_err(|_| CodecError::FieldValidation {
                field: "interface_version",
                reason: format!("unsupported version {version:#04x}"),
            })?;
        let addr_ton = ton(decode_u8(buf)?, "addr_ton")?;
        let addr_npi = npi(decode_u8(buf)?, "addr_npi")?;
        let address_range = decode_cstring(buf, ADDRESS_RANGE_SIZE, "address_range")?;

        Ok(Self {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
            password,
            system_type,
            interface_version,
            addr_ton,
            addr_npi,
            address_range,
        })
    }
}

/// Response to a bind_transceiver. On failure the SMSC may omit the body.
#[derive(Clone, Debug, PartialEq)]
pub struct BindTransceiverResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// 5.2.1 system_id of the SMSC
    pub system_id: String,
}

impl BindTransceiverResponse {
    pub fn new(sequence_number: u32, system_id: &str) -> Self {
        Self {
            command_status: CommandStatus::Ok,
            sequence_number,
            system_id: system_id.to_string(),
        }
    }

    pub fn error(sequence_number: u32, command_status: CommandStatus) -> Self {
        Self {
            command_status,
            sequence_number,
            system_id: String::new(),
        }
    }
}

impl Encodable for BindTransceiverResponse {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        PduHeader::placeholder(
            CommandId::BindTransceiverResp,
            self.command_status,
            self.sequence_number,
        )
        .encode(buf);

        encode_cstring(buf, &self.system_id, SYSTEM_ID_SIZE, "system_id")
    }
}

impl Decodable for BindTransceiverResponse {
    fn command_id() -> CommandId {
        CommandId::BindTransceiverResp
    }

    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        Self::validate_header(&header)?;

        let system_id = if buf.has_remaining() {
            decode_cstring(buf, SYSTEM_ID_SIZE, "system_id")?
        } else {
            String::new()
        };

        // sc_interface_version TLV, if present, is not needed
        Ok(Self {
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
        })
    }
}

pub(crate) fn ton(value: u8, field: &'static str) -> Result<TypeOfNumber, CodecError> {
    TypeOfNumber::try_from(value).map_err(|_| CodecError::FieldValidation {
        field,
        reason: format!("unknown type of number {value:#04x}"),
    })
}

pub(crate) fn npi(value: u8, field: &'static str) -> Result<NumericPlanIndicator, CodecError> {
    NumericPlanIndicator::try_from(value).map_err(|_| CodecError::FieldValidation {
        field,
        reason: format!("unknown numbering plan {value:#04x}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Frame;

    #[test]
    fn bind_transceiver_to_bytes() {
        let bind = BindTransceiver::new(1, "SMPP3TEST", "secret08");
        let bytes = bind.to_bytes().unwrap();

        let expected: Vec<u8> = [
            &[0x00, 0x00, 0x00, 0x2A][..], // command_length = 42
            &[0x00, 0x00, 0x00, 0x09],     // bind_transceiver
            &[0x00, 0x00, 0x00, 0x00],
            &[0x00, 0x00, 0x00, 0x01],
            b"SMPP3TEST\0",
            b"secret08\0",
            b"\0",                // system_type
            &[0x34, 0x00, 0x00], // version, ton, npi
            b"\0",                // address_range
        ]
        .concat();

        assert_eq!(bytes.as_ref(), expected.as_slice());
    }

    #[test]
    fn bind_transceiver_rejects_long_password() {
        let bind = BindTransceiver::new(1, "esme", "ninechars");
        assert!(matches!(
            bind.to_bytes(),
            Err(CodecError::FieldValidation {
                field: "password",
                ..
            })
        ));
    }

    #[test]
    fn bind_transceiver_parses_back() {
        let mut bind = BindTransceiver::new(5, "esme", "pw");
        bind.system_type = "VMS".to_string();
        bind.addr_ton = TypeOfNumber::International;
        bind.addr_npi = NumericPlanIndicator::Isdn;

        let bytes = bind.to_bytes().unwrap();
        let frame = Frame::parse(&mut Cursor::new(bytes.as_ref())).unwrap();
        assert_eq!(frame, Frame::BindTransceiver(bind));
    }

    #[test]
    fn error_response_without_body() {
        let bytes: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, 0x80, 0x00, 0x00, 0x09, // bind_transceiver_resp
            0x00, 0x00, 0x00, 0x0E, 0x00, 0x00, 0x00, 0x01, // ESME_RINVPASWD
        ];

        match Frame::parse(&mut Cursor::new(bytes)).unwrap() {
            Frame::BindTransceiverResp(resp) => {
                assert_eq!(resp.command_status, CommandStatus::InvalidPassword);
                assert!(resp.system_id.is_empty());
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[test]
    fn response_ignores_trailing_tlv() {
        let mut wire = BytesMut::new();
        wire.put_u32(0);
        wire.put_u32(CommandId::BindTransceiverResp as u32);
        wire.put_u32(0);
        wire.put_u32(2);
        wire.put_slice(b"SMSC\0");
        wire.put_slice(&[0x02, 0x10, 0x00, 0x01, 0x34]); // sc_interface_version
        let len = wire.len() as u32;
        wire[0..4].copy_from_slice(&len.to_be_bytes());

        let frame = Frame::parse(&mut Cursor::new(wire.as_ref())).unwrap();
        assert_eq!(
            frame,
            Frame::BindTransceiverResp(BindTransceiverResponse::new(2, "SMSC"))
        );
    }
}
