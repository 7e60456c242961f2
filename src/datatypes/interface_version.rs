use num_enum::TryFromPrimitive;

/// SMPP protocol version announced in bind requests (section 5.2.4).
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InterfaceVersion {
    SmppV33 = 0x33,
    SmppV34 = 0x34,
}
