//! JSON codec for the servo command channel.
//!
//! Decoding distinguishes two failure modes the transport treats
//! differently: malformed messages are logged and dropped, while
//! well-formed JSON carrying an unknown `command` is silently ignored.

use serde_json::Value;
use thiserror::Error;

use crate::messages::{Command, Response, COMMAND_NAMES};

/// Errors that can occur during message encoding/decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The text was not valid JSON, or a known command carried bad fields.
    #[error("malformed command message: {0}")]
    Malformed(serde_json::Error),

    /// Valid JSON whose `command` field names no known operation.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// JSON serialization of a response failed.
    #[error("failed to serialize response: {0}")]
    Serialize(serde_json::Error),
}

/// Decode a command from JSON text received over the transport.
pub fn decode_command(text: &str) -> Result<Command, CodecError> {
    let value: Value = serde_json::from_str(text).map_err(CodecError::Malformed)?;
    let tag = value
        .get("command")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match serde_json::from_value::<Command>(value) {
        Ok(command) => Ok(command),
        Err(err) if COMMAND_NAMES.contains(&tag.as_str()) => Err(CodecError::Malformed(err)),
        Err(_) => Err(CodecError::UnknownCommand(tag)),
    }
}

/// Encode a response to a JSON string for transmission.
pub fn encode_response(response: &Response) -> Result<String, CodecError> {
    serde_json::to_string(response).map_err(CodecError::Serialize)
}
