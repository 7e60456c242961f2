// Field sizes shared by submit_sm and deliver_sm, null terminator included
pub const SERVICE_TYPE_SIZE: usize = 6;
pub const ADDRESS_SIZE: usize = 21;
pub const TIME_SIZE: usize = 17;

/// Largest short_message that fits the sm_length octet
pub const MAX_SHORT_MESSAGE_LENGTH: usize = 254;

/// data_coding values used by the gateway (section 5.2.19)
pub mod data_coding {
    pub const DEFAULT: u8 = 0x00;
    pub const LATIN1: u8 = 0x03;
    pub const UCS2: u8 = 0x08;
}

/// registered_delivery bit requesting an SMSC delivery receipt
pub const DELIVERY_RECEIPT_REQUESTED: u8 = 0x01;

/// Pick the narrowest data_coding able to carry `text` and encode it.
///
/// ASCII goes out unchanged under the SMSC default alphabet, text that fits
/// ISO-8859-1 is sent as Latin-1, everything else as UCS-2 (UTF-16BE).
pub fn encode_text(text: &str) -> (u8, Vec<u8>) {
    if text.is_ascii() {
        return (data_coding::DEFAULT, text.as_bytes().to_vec());
    }

    if text.chars().all(|c| (c as u32) <= 0xFF) {
        return (data_coding::LATIN1, text.chars().map(|c| c as u8).collect());
    }

    let ucs2 = text
        .encode_utf16()
        .flat_map(|unit| unit.to_be_bytes())
        .collect();
    (data_coding::UCS2, ucs2)
}

/// Best effort decoding of a short_message for logging inbound deliveries.
pub fn decode_text(data_coding: u8, payload: &[u8]) -> String {
    match data_coding {
        data_coding::LATIN1 => payload.iter().map(|&b| b as char).collect(),
        data_coding::UCS2 => {
            let units: Vec<u16> = payload
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => String::from_utf8_lossy(payload).into_owned(),
    }
}
