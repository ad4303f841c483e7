//! Response frames and their JSONL serialization.

use std::io::Write;

use jmp_protocol::{Envelope, ProtocolError};
use serde::Serialize;

use super::errors::DispatchError;
use super::status::{MESSAGE_TOO_LARGE_CODE, STATUS_PAYLOAD_TOO_LARGE, status_for};

/// The frame written back for each received line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseFrame {
    /// The message was handled and produced a reply envelope.
    Reply {
        /// The reply, exactly as built by the message handler.
        envelope: Envelope,
    },
    /// The message was handled and produced no reply.
    Empty,
    /// Handling failed.
    Error {
        /// Transport status code.
        status: u16,
        /// Machine-readable error code.
        code: &'static str,
        /// Human-readable description.
        message: String,
    },
}

impl ResponseFrame {
    /// Frames the outcome of handling one message.
    #[must_use]
    pub fn from_outcome(outcome: Result<Option<Envelope>, ProtocolError>) -> Self {
        match outcome {
            Ok(Some(envelope)) => Self::Reply { envelope },
            Ok(None) => Self::Empty,
            Err(error) => Self::from_error(&error),
        }
    }

    /// Frames a protocol failure.
    #[must_use]
    pub fn from_error(error: &ProtocolError) -> Self {
        Self::Error {
            status: status_for(error),
            code: error.kind().as_str(),
            message: error.to_string(),
        }
    }

    pub(crate) fn message_too_large(size: usize, limit: usize) -> Self {
        Self::Error {
            status: STATUS_PAYLOAD_TOO_LARGE,
            code: MESSAGE_TOO_LARGE_CODE,
            message: DispatchError::message_too_large(size, limit).to_string(),
        }
    }
}

/// Writes response frames as JSON lines.
pub(crate) struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    pub(crate) const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one frame followed by a newline and flushes.
    pub(crate) fn write_frame(&mut self, frame: &ResponseFrame) -> Result<(), DispatchError> {
        serde_json::to_writer(&mut self.writer, frame)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
