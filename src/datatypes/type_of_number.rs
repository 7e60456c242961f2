use num_enum::TryFromPrimitive;

/// Type of Number (section 5.2.5)
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeOfNumber {
    Unknown = 0x00,
    International = 0x01,
    National = 0x02,
    NetworkSpecific = 0x03,
    SubscriberNumber = 0x04,
    Alphanumeric = 0x05,
    Abbreviated = 0x06,
}

impl TypeOfNumber {
    /// Pick a TON from the textual form of an address.
    ///
    /// `+` prefixed digits are international, pure digits are left to the
    /// SMSC, and anything with letters is an alphanumeric sender id.
    pub fn for_address(address: &str) -> Self {
        if let Some(rest) = address.strip_prefix('+') {
            if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
                return TypeOfNumber::International;
            }
        }
        if address.is_empty() || address.bytes().all(|b| b.is_ascii_digit()) {
            TypeOfNumber::Unknown
        } else {
            TypeOfNumber::Alphanumeric
        }
    }
}
