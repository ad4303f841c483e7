//! Maps protocol failures onto transport status codes.

use jmp_protocol::{FetchError, ProtocolError};

/// Status reported for malformed input.
pub const STATUS_BAD_REQUEST: u16 = 400;
/// Status reported when the message type has no schema.
pub const STATUS_NOT_FOUND: u16 = 404;
/// Status reported when a line exceeds the size limit.
pub const STATUS_PAYLOAD_TOO_LARGE: u16 = 413;
/// Status reported when the payload violates its schema.
pub const STATUS_UNPROCESSABLE: u16 = 422;
/// Status reported for router and engine failures.
pub const STATUS_INTERNAL: u16 = 500;
/// Status reported when a schema store cannot supply a schema.
pub const STATUS_UNAVAILABLE: u16 = 503;

/// Error code of the frame sent for oversized lines.
pub const MESSAGE_TOO_LARGE_CODE: &str = "message_too_large";

/// Returns the status code reported to the client for `error`.
#[must_use]
pub const fn status_for(error: &ProtocolError) -> u16 {
    match error {
        ProtocolError::Parse { .. }
        | ProtocolError::InvalidEnvelope { .. }
        | ProtocolError::EnvelopeValidation { .. } => STATUS_BAD_REQUEST,
        ProtocolError::SchemaFetch {
            source: FetchError::UnknownMessageType { .. },
            ..
        } => STATUS_NOT_FOUND,
        ProtocolError::SchemaFetch { .. } => STATUS_UNAVAILABLE,
        ProtocolError::TypeValidation { .. } => STATUS_UNPROCESSABLE,
        ProtocolError::Route(_) | ProtocolError::Internal { .. } => STATUS_INTERNAL,
    }
}
