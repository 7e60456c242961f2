// ABOUTME: SMPP v3.4 PDU types and wire enums for a transceiver session
// ABOUTME: Each PDU implements the codec's Encodable and Decodable traits

mod bind_transceiver;
mod command_id;
mod command_status;
mod deliver_sm;
mod enquire_link;
mod generic_nack;
mod interface_version;
mod numeric_plan_indicator;
pub mod short_message;
mod submit_sm;
mod type_of_number;
mod unbind;

pub use bind_transceiver::{BindTransceiver, BindTransceiverResponse};
pub use command_id::CommandId;
pub use command_status::CommandStatus;
pub use deliver_sm::{DeliverSm, DeliverSmResponse};
pub use enquire_link::{EnquireLink, EnquireLinkResponse};
pub use generic_nack::GenericNack;
pub use interface_version::InterfaceVersion;
pub use numeric_plan_indicator::NumericPlanIndicator;
pub use submit_sm::{SubmitSm, SubmitSmResponse};
pub use type_of_number::TypeOfNumber;
pub use unbind::{Unbind, UnbindResponse};
