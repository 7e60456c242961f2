// ABOUTME: Macros that remove boilerplate from the SMPP PDU implementations
// ABOUTME: Header-only PDUs and the shared submit_sm/deliver_sm body layout

/// Implements Encodable/Decodable plus `new`/`error` constructors for PDUs
/// that consist of the 16 byte header only.
macro_rules! impl_header_only_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $pdu_type {
            pub fn new(sequence_number: u32) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                }
            }

            pub fn error(sequence_number: u32, status: $crate::datatypes::CommandStatus) -> Self {
                Self {
                    command_status: status,
                    sequence_number,
                }
            }
        }

        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;

                Self::validate_header(&header)?;

                if buf.has_remaining() {
                    return Err($crate::codec::CodecError::FieldValidation {
                        field: concat!(stringify!($pdu_type), "_body"),
                        reason: concat!(stringify!($pdu_type), " PDU should have no body")
                            .to_string(),
                    });
                }

                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                $crate::codec::PduHeader::placeholder(
                    $command_id,
                    self.command_status,
                    self.sequence_number,
                )
                .encode(buf);
                Ok(())
            }
        }
    };
}

/// Implements Encodable/Decodable for PDUs using the submit_sm body layout
/// (submit_sm and deliver_sm share it field for field). Optional parameters
/// are skipped on decode and never written.
macro_rules! impl_short_message_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                use bytes::BufMut;
                use $crate::codec::encode_cstring;
                use $crate::datatypes::short_message::*;

                if self.short_message.len() > MAX_SHORT_MESSAGE_LENGTH {
                    return Err($crate::codec::CodecError::FieldValidation {
                        field: "short_message",
                        reason: format!(
                            "{} octets exceeds maximum of {}",
                            self.short_message.len(),
                            MAX_SHORT_MESSAGE_LENGTH
                        ),
                    });
                }

                $crate::codec::PduHeader::placeholder(
                    $command_id,
                    self.command_status,
                    self.sequence_number,
                )
                .encode(buf);

                encode_cstring(buf, &self.service_type, SERVICE_TYPE_SIZE, "service_type")?;
                buf.put_u8(self.source_addr_ton as u8);
                buf.put_u8(self.source_addr_npi as u8);
                encode_cstring(buf, &self.source_addr, ADDRESS_SIZE, "source_addr")?;
                buf.put_u8(self.dest_addr_ton as u8);
                buf.put_u8(self.dest_addr_npi as u8);
                encode_cstring(buf, &self.destination_addr, ADDRESS_SIZE, "destination_addr")?;
                buf.put_u8(self.esm_class);
                buf.put_u8(self.protocol_id);
                buf.put_u8(self.priority_flag);
                encode_cstring(
                    buf,
                    &self.schedule_delivery_time,
                    TIME_SIZE,
                    "schedule_delivery_time",
                )?;
                encode_cstring(buf, &self.validity_period, TIME_SIZE, "validity_period")?;
                buf.put_u8(self.registered_delivery);
                buf.put_u8(self.replace_if_present_flag);
                buf.put_u8(self.data_coding);
                buf.put_u8(self.sm_default_msg_id);
                buf.put_u8(self.short_message.len() as u8);
                buf.put_slice(&self.short_message);

                Ok(())
            }
        }

        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;
                use $crate::codec::{decode_cstring, decode_u8};
                use $crate::datatypes::bind_transceiver::{npi, ton};
                use $crate::datatypes::short_message::*;

                Self::validate_header(&header)?;

                let service_type = decode_cstring(buf, SERVICE_TYPE_SIZE, "service_type")?;
                let source_addr_ton = ton(decode_u8(buf)?, "source_addr_ton")?;
                let source_addr_npi = npi(decode_u8(buf)?, "source_addr_npi")?;
                let source_addr = decode_cstring(buf, ADDRESS_SIZE, "source_addr")?;
                let dest_addr_ton = ton(decode_u8(buf)?, "dest_addr_ton")?;
                let dest_addr_npi = npi(decode_u8(buf)?, "dest_addr_npi")?;
                let destination_addr = decode_cstring(buf, ADDRESS_SIZE, "destination_addr")?;
                let esm_class = decode_u8(buf)?;
                let protocol_id = decode_u8(buf)?;
                let priority_flag = decode_u8(buf)?;
                let schedule_delivery_time =
                    decode_cstring(buf, TIME_SIZE, "schedule_delivery_time")?;
                let validity_period = decode_cstring(buf, TIME_SIZE, "validity_period")?;
                let registered_delivery = decode_u8(buf)?;
                let replace_if_present_flag = decode_u8(buf)?;
                let data_coding = decode_u8(buf)?;
                let sm_default_msg_id = decode_u8(buf)?;

                let sm_length = decode_u8(buf)? as usize;
                if buf.remaining() < sm_length {
                    return Err($crate::codec::CodecError::FieldValidation {
                        field: "short_message",
                        reason: format!(
                            "sm_length {} exceeds remaining {} octets",
                            sm_length,
                            buf.remaining()
                        ),
                    });
                }
                let short_message = buf.copy_to_bytes(sm_length);

                // Optional parameters
                buf.advance(buf.remaining());

                Ok(Self {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                    service_type,
                    source_addr_ton,
                    source_addr_npi,
                    source_addr,
                    dest_addr_ton,
                    dest_addr_npi,
                    destination_addr,
                    esm_class,
                    protocol_id,
                    priority_flag,
                    schedule_delivery_time,
                    validity_period,
                    registered_delivery,
                    replace_if_present_flag,
                    data_coding,
                    sm_default_msg_id,
                    short_message,
                })
            }
        }
    };
}

pub(crate) use {impl_header_only_pdu, impl_short_message_pdu};
