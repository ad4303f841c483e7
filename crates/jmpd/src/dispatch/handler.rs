//! Connection handler that runs each received line through the message
//! handler.

use std::io::{self, BufRead, BufReader, Write};

use jmp_protocol::MessageHandler;
use tracing::{debug, warn};

use crate::transport::{ConnectionHandler, ConnectionStream};

use super::DISPATCH_TARGET;
use super::errors::DispatchError;
use super::response::{ResponseFrame, ResponseWriter};

/// Serves JSONL envelope connections.
pub(crate) struct EnvelopeConnectionHandler {
    handler: MessageHandler,
    max_message_bytes: usize,
}

impl EnvelopeConnectionHandler {
    pub(crate) const fn new(handler: MessageHandler, max_message_bytes: usize) -> Self {
        Self {
            handler,
            max_message_bytes,
        }
    }

    /// Answers every line on `stream` until EOF, an IO failure, or an
    /// oversized line.
    pub(crate) fn serve<S>(&self, stream: S) -> Result<(), DispatchError>
    where
        S: io::Read + Write,
    {
        let mut reader = BufReader::new(stream);
        loop {
            let line = match read_frame(&mut reader, self.max_message_bytes) {
                Ok(Some(line)) => line,
                Ok(None) => return Ok(()),
                Err(DispatchError::MessageTooLarge { size, limit }) => {
                    warn!(
                        target: DISPATCH_TARGET,
                        size,
                        limit,
                        "message too large; closing connection"
                    );
                    let frame = ResponseFrame::message_too_large(size, limit);
                    return ResponseWriter::new(reader.get_mut()).write_frame(&frame);
                }
                Err(error) => return Err(error),
            };

            let frame = ResponseFrame::from_outcome(self.handler.handle_message(line.as_slice()));
            ResponseWriter::new(reader.get_mut()).write_frame(&frame)?;
        }
    }
}

impl ConnectionHandler for EnvelopeConnectionHandler {
    fn handle(&self, stream: ConnectionStream) {
        let transport = stream.transport();
        match self.serve(stream) {
            Ok(()) => debug!(target: DISPATCH_TARGET, transport, "connection closed"),
            Err(error) => warn!(
                target: DISPATCH_TARGET,
                transport,
                %error,
                "connection ended with an error"
            ),
        }
    }
}

/// Reads one line, without its terminator, of at most `limit` bytes.
///
/// Returns `Ok(None)` at EOF. A final line without a trailing newline is
/// still returned.
fn read_frame<R: BufRead>(reader: &mut R, limit: usize) -> Result<Option<Vec<u8>>, DispatchError> {
    let mut line = Vec::new();
    loop {
        let (consumed, complete) = {
            let available = match reader.fill_buf() {
                Ok(available) => available,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(error.into()),
            };
            if available.is_empty() {
                return Ok(if line.is_empty() { None } else { Some(line) });
            }
            match available.iter().position(|byte| *byte == b'\n') {
                Some(end) => {
                    line.extend(available.iter().take(end));
                    (end + 1, true)
                }
                None => {
                    line.extend_from_slice(available);
                    (available.len(), false)
                }
            }
        };
        reader.consume(consumed);

        if line.len() > limit {
            return Err(DispatchError::message_too_large(line.len(), limit));
        }
        if complete {
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            return Ok(Some(line));
        }
    }
}
