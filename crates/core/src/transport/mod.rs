//! Transport abstraction.
//!
//! This module provides a `Transport` trait for exchanging packets with the
//! remote, plus a plain TCP implementation using length-prefixed frames.

mod frame;
mod tcp;
mod types;

pub use frame::{decode_frame, encode_frame, FRAME_MAGIC, MAX_FRAME_LEN};
pub use tcp::TcpTransport;
pub use types::*;
