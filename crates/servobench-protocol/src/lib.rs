//! # servobench-protocol
//!
//! Command protocol message types and codec.
//!
//! One JSON object per message; the `command` field selects the
//! operation. Replies echo `status` and the request command. The
//! transport (WebSocket, serial bridge) only moves text frames; all
//! message semantics live here and in the dispatcher.

pub mod codec;
pub mod messages;

pub use codec::{decode_command, encode_response, CodecError};
pub use messages::{Ack, Command, ConfigReport, Response, ServoReport, Status};
