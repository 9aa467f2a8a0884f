//! Protocol vocabulary: message kinds, result codes, identifiers, packets and
//! the message bodies used by the login and ticket flows.

mod error;
mod ids;
mod kind;
mod messages;
mod packet;
mod result;

pub use error::ProtocolError;
pub use ids::{JobId, SteamId};
pub use kind::MessageKind;
pub use messages::*;
pub use packet::{decode_body, encode_body, Packet, PACKET_HEADER_LEN};
pub use result::ResultCode;
