//! Codec for channel frames.
//!
//! Frames are JSON text in both directions; every transport carries them
//! verbatim. Encoding is for client events, decoding for server events.

use thiserror::Error;

use crate::events::{ClientEvent, ServerEvent};

/// Maximum accepted frame size (64 KiB).
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Codec errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Frame exceeds maximum size.
    #[error("Frame size {0} exceeds maximum {MAX_FRAME_SIZE}")]
    FrameTooLarge(usize),

    /// JSON encoding failed.
    #[error("Encoding error: {0}")]
    Encode(#[source] serde_json::Error),

    /// Frame is not a known event.
    #[error("Decoding error: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encode a client event into a JSON text frame.
///
/// # Errors
///
/// Returns an error if serialization fails or the frame exceeds
/// [`MAX_FRAME_SIZE`].
pub fn encode(event: &ClientEvent) -> Result<String, ProtocolError> {
    let frame = serde_json::to_string(event).map_err(ProtocolError::Encode)?;
    if frame.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(frame.len()));
    }
    Ok(frame)
}

/// Decode a server event from a JSON text frame.
///
/// # Errors
///
/// Returns an error if the frame exceeds [`MAX_FRAME_SIZE`] or does not
/// describe a known event.
pub fn decode(frame: &str) -> Result<ServerEvent, ProtocolError> {
    if frame.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(frame.len()));
    }
    serde_json::from_str(frame).map_err(ProtocolError::Decode)
}
