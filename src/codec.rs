// SMPP v3.4 codec for the transceiver PDU set.
//
// Each PDU implements Encodable/Decodable; `Frame` is the tagged union the
// connection layer reads and writes, and `PduRegistry` maps a command_id to
// the decoder for its body.

use crate::datatypes::{
    BindTransceiver, BindTransceiverResponse, CommandId, CommandStatus, DeliverSm,
    DeliverSmResponse, EnquireLink, EnquireLinkResponse, GenericNack, SubmitSm,
    SubmitSmResponse, Unbind, UnbindResponse,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::LazyLock;
use thiserror::Error;

/// Maximum allowed PDU size to prevent memory exhaustion
pub const MAX_PDU_SIZE: u32 = 65536;

/// SMPP v3.4 PDU header (16 bytes, common to all PDUs)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: CommandId,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl PduHeader {
    pub const SIZE: usize = 16;

    /// Decode a PDU header from the buffer, validating length and sequence.
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let command_length = buf.get_u32();
        let command_id_raw = buf.get_u32();
        let command_id = CommandId::try_from(command_id_raw)
            .map_err(|_| CodecError::InvalidCommandId(command_id_raw))?;
        let command_status = CommandStatus::from(buf.get_u32());
        let sequence_number = buf.get_u32();

        if !(Self::SIZE as u32..=MAX_PDU_SIZE).contains(&command_length) {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: Self::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        if !command_id.is_response() && command_status != CommandStatus::Ok {
            return Err(CodecError::InvalidRequestStatus {
                command_id,
                command_status,
            });
        }

        // generic_nack may carry 0 when the offending PDU's sequence was unreadable
        if (sequence_number == 0 && command_id != CommandId::GenericNack)
            || sequence_number == 0xFFFF_FFFF
        {
            return Err(CodecError::ReservedSequenceNumber(sequence_number));
        }

        Ok(PduHeader {
            command_length,
            command_id,
            command_status,
            sequence_number,
        })
    }

    /// Encode the header. `command_length` is patched by `Encodable::to_bytes`.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.command_length);
        buf.put_u32(self.command_id as u32);
        buf.put_u32(self.command_status.into());
        buf.put_u32(self.sequence_number);
    }

    /// Header with a zero length placeholder for the given PDU.
    pub fn placeholder(
        command_id: CommandId,
        command_status: CommandStatus,
        sequence_number: u32,
    ) -> Self {
        Self {
            command_length: 0,
            command_id,
            command_status,
            sequence_number,
        }
    }
}

/// Types that can be written to the wire
pub trait Encodable {
    /// Encode this PDU (header included) to the buffer
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Encode into a fresh buffer and fix up the command_length field.
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(64);
        self.encode(&mut buf)?;

        let length = buf.len() as u32;
        if length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidPduLength {
                length,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }
        buf[0..4].copy_from_slice(&length.to_be_bytes());

        Ok(buf.freeze())
    }
}

/// Types that can be read from the wire
pub trait Decodable: Sized {
    /// Decode this PDU from the buffer positioned after the header
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    /// The command_id this PDU type is registered under
    fn command_id() -> CommandId;

    fn validate_header(header: &PduHeader) -> Result<(), CodecError> {
        if header.command_id != Self::command_id() {
            return Err(CodecError::UnexpectedCommandId {
                expected: Self::command_id(),
                actual: header.command_id,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Invalid command_id: {0:#x}")]
    InvalidCommandId(u32),

    #[error("Invalid PDU length: {length}, must be {min}-{max}")]
    InvalidPduLength { length: u32, min: u32, max: u32 },

    #[error("Request PDU {command_id:?} has non-zero status: {command_status}")]
    InvalidRequestStatus {
        command_id: CommandId,
        command_status: CommandStatus,
    },

    #[error("Reserved sequence number: {0}")]
    ReservedSequenceNumber(u32),

    #[error("Unexpected command_id: expected {expected:?}, got {actual:?}")]
    UnexpectedCommandId {
        expected: CommandId,
        actual: CommandId,
    },

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("UTF-8 decoding error in field '{field}': {source}")]
    Utf8Error {
        field: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

impl CodecError {
    /// The command_status to report back to the peer in a generic_nack
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            CodecError::InvalidPduLength { .. } => CommandStatus::InvalidCommandLength,
            CodecError::InvalidCommandId(_) => CommandStatus::InvalidCommandId,
            CodecError::FieldValidation { field, .. } => match *field {
                "source_addr" => CommandStatus::InvalidSourceAddress,
                "destination_addr" => CommandStatus::InvalidDestinationAddress,
                "short_message" => CommandStatus::InvalidMsgLength,
                _ => CommandStatus::SystemError,
            },
            _ => CommandStatus::SystemError,
        }
    }
}

/// Decode a C-Octet string of at most `max_len` bytes (terminator included).
pub fn decode_cstring(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field: &'static str,
) -> Result<String, CodecError> {
    let chunk = buf.chunk();
    let Some(end) = chunk.iter().take(max_len).position(|&b| b == 0) else {
        return Err(if chunk.len() < max_len {
            CodecError::Incomplete
        } else {
            CodecError::FieldValidation {
                field,
                reason: format!("missing null terminator within {max_len} bytes"),
            }
        });
    };

    let value = chunk[..end].to_vec();
    buf.advance(end + 1);

    String::from_utf8(value).map_err(|source| CodecError::Utf8Error { field, source })
}

/// Encode a C-Octet string, rejecting values that do not fit in `max_len`
/// bytes including the terminator.
pub fn encode_cstring(
    buf: &mut BytesMut,
    value: &str,
    max_len: usize,
    field: &'static str,
) -> Result<(), CodecError> {
    if value.len() >= max_len {
        return Err(CodecError::FieldValidation {
            field,
            reason: format!("{} bytes exceeds maximum of {}", value.len(), max_len - 1),
        });
    }
    buf.put_slice(value.as_bytes());
    buf.put_u8(0);
    Ok(())
}

pub fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u8())
}

/// Every PDU the transceiver reads or writes
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    BindTransceiver(BindTransceiver),
    BindTransceiverResp(BindTransceiverResponse),
    SubmitSm(Box<SubmitSm>),
    SubmitSmResp(SubmitSmResponse),
    DeliverSm(Box<DeliverSm>),
    DeliverSmResp(DeliverSmResponse),
    EnquireLink(EnquireLink),
    EnquireLinkResp(EnquireLinkResponse),
    Unbind(Unbind),
    UnbindResp(UnbindResponse),
    GenericNack(GenericNack),
    /// A PDU this codec has no decoder for. Kept so the session can nack it.
    Unknown {
        command_id: u32,
        sequence_number: u32,
        body: Bytes,
    },
}

type DecoderFn =
    Box<dyn Fn(PduHeader, &mut Cursor<&[u8]>) -> Result<Frame, CodecError> + Send + Sync>;

/// Registry of PDU body decoders keyed by command_id
pub struct PduRegistry {
    decoders: HashMap<CommandId, DecoderFn>,
}

static REGISTRY: LazyLock<PduRegistry> = LazyLock::new(PduRegistry::new);

impl PduRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            decoders: HashMap::new(),
        };

        registry.register::<BindTransceiver, _>(Frame::BindTransceiver);
        registry.register::<BindTransceiverResponse, _>(Frame::BindTransceiverResp);
        registry.register::<SubmitSm, _>(|pdu| Frame::SubmitSm(Box::new(pdu)));
        registry.register::<SubmitSmResponse, _>(Frame::SubmitSmResp);
        registry.register::<DeliverSm, _>(|pdu| Frame::DeliverSm(Box::new(pdu)));
        registry.register::<DeliverSmResponse, _>(Frame::DeliverSmResp);
        registry.register::<EnquireLink, _>(Frame::EnquireLink);
        registry.register::<EnquireLinkResponse, _>(Frame::EnquireLinkResp);
        registry.register::<Unbind, _>(Frame::Unbind);
        registry.register::<UnbindResponse, _>(Frame::UnbindResp);
        registry.register::<GenericNack, _>(Frame::GenericNack);

        registry
    }

    fn register<T, F>(&mut self, frame_constructor: F)
    where
        T: Decodable + 'static,
        F: Fn(T) -> Frame + Send + Sync + 'static,
    {
        let decoder = Box::new(move |header: PduHeader, buf: &mut Cursor<&[u8]>| {
            let pdu = T::decode(header, buf)?;
            Ok(frame_constructor(pdu))
        });
        self.decoders.insert(T::command_id(), decoder);
    }

    /// Decode a PDU body. Commands without a decoder become `Frame::Unknown`.
    pub fn decode_pdu(
        &self,
        header: PduHeader,
        buf: &mut Cursor<&[u8]>,
    ) -> Result<Frame, CodecError> {
        match self.decoders.get(&header.command_id) {
            Some(decoder) => decoder(header, buf),
            None => {
                tracing::debug!(
                    command_id = ?header.command_id,
                    "no decoder registered, treating PDU as opaque"
                );
                Ok(Frame::Unknown {
                    command_id: header.command_id as u32,
                    sequence_number: header.sequence_number,
                    body: buf.copy_to_bytes(buf.remaining()),
                })
            }
        }
    }

    pub fn is_registered(&self, command_id: CommandId) -> bool {
        self.decoders.contains_key(&command_id)
    }
}

impl Default for PduRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// Check whether `buf` holds a complete PDU, returning its length.
    pub fn check(buf: &mut Cursor<&[u8]>) -> Result<usize, CodecError> {
        if buf.remaining() < PduHeader::SIZE {
            return Err(CodecError::Incomplete);
        }

        let pos = buf.position();
        let command_length = buf.get_u32();
        buf.set_position(pos);

        if !(PduHeader::SIZE as u32..=MAX_PDU_SIZE).contains(&command_length) {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        if buf.remaining() < command_length as usize {
            return Err(CodecError::Incomplete);
        }

        Ok(command_length as usize)
    }

    /// Parse one complete PDU. The caller must have validated it with `check`;
    /// the cursor is advanced past the whole PDU, including any optional
    /// parameters the decoder did not consume.
    pub fn parse(buf: &mut Cursor<&[u8]>) -> Result<Frame, CodecError> {
        let len = Frame::check(buf)?;
        let data: &[u8] = *buf.get_ref();
        let start = buf.position() as usize;
        let pdu = &data[start..start + len];
        buf.set_position((start + len) as u64);

        let mut cursor = Cursor::new(pdu);
        match PduHeader::decode(&mut cursor) {
            // The PDU is complete, so running out of bytes means a short body
            Ok(header) => REGISTRY
                .decode_pdu(header, &mut cursor)
                .map_err(|e| match e {
                    CodecError::Incomplete => CodecError::FieldValidation {
                        field: "body",
                        reason: format!("truncated {:?} body", header.command_id),
                    },
                    other => other,
                }),
            Err(CodecError::InvalidCommandId(command_id)) => Ok(Frame::Unknown {
                command_id,
                sequence_number: u32::from_be_bytes([pdu[12], pdu[13], pdu[14], pdu[15]]),
                body: Bytes::copy_from_slice(&pdu[PduHeader::SIZE..]),
            }),
            Err(e) => Err(e),
        }
    }

    /// Encode the frame for the wire
    pub fn to_bytes(&self) -> Result<Bytes, CodecError> {
        match self {
            Frame::BindTransceiver(pdu) => pdu.to_bytes(),
            Frame::BindTransceiverResp(pdu) => pdu.to_bytes(),
            Frame::SubmitSm(pdu) => pdu.to_bytes(),
            Frame::SubmitSmResp(pdu) => pdu.to_bytes(),
            Frame::DeliverSm(pdu) => pdu.to_bytes(),
            Frame::DeliverSmResp(pdu) => pdu.to_bytes(),
            Frame::EnquireLink(pdu) => pdu.to_bytes(),
            Frame::EnquireLinkResp(pdu) => pdu.to_bytes(),
            Frame::Unbind(pdu) => pdu.to_bytes(),
            Frame::UnbindResp(pdu) => pdu.to_bytes(),
            Frame::GenericNack(pdu) => pdu.to_bytes(),
            Frame::Unknown { command_id, .. } => Err(CodecError::InvalidCommandId(*command_id)),
        }
    }

    pub fn sequence_number(&self) -> u32 {
        match self {
            Frame::BindTransceiver(pdu) => pdu.sequence_number,
            Frame::BindTransceiverResp(pdu) => pdu.sequence_number,
            Frame::SubmitSm(pdu) => pdu.sequence_number,
            Frame::SubmitSmResp(pdu) => pdu.sequence_number,
            Frame::DeliverSm(pdu) => pdu.sequence_number,
            Frame::DeliverSmResp(pdu) => pdu.sequence_number,
            Frame::EnquireLink(pdu) => pdu.sequence_number,
            Frame::EnquireLinkResp(pdu) => pdu.sequence_number,
            Frame::Unbind(pdu) => pdu.sequence_number,
            Frame::UnbindResp(pdu) => pdu.sequence_number,
            Frame::GenericNack(pdu) => pdu.sequence_number,
            Frame::Unknown {
                sequence_number, ..
            } => *sequence_number,
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Frame::BindTransceiver(_) => "bind_transceiver",
            Frame::BindTransceiverResp(_) => "bind_transceiver_resp",
            Frame::SubmitSm(_) => "submit_sm",
            Frame::SubmitSmResp(_) => "submit_sm_resp",
            Frame::DeliverSm(_) => "deliver_sm",
            Frame::DeliverSmResp(_) => "deliver_sm_resp",
            Frame::EnquireLink(_) => "enquire_link",
            Frame::EnquireLinkResp(_) => "enquire_link_resp",
            Frame::Unbind(_) => "unbind",
            Frame::UnbindResp(_) => "unbind_resp",
            Frame::GenericNack(_) => "generic_nack",
            Frame::Unknown { .. } => "unknown",
        }
    }
}
