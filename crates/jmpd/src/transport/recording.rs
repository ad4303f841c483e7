//! Connection handler for listener tests that reports what each peer sent.

use std::io::{BufRead, BufReader};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use super::{ConnectionHandler, ConnectionStream};

/// One served connection as seen by [`RecordingHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServedConnection {
    pub(crate) transport: &'static str,
    pub(crate) first_line: String,
}

/// Reads the first line of every connection, reports it and hangs up.
pub(crate) struct RecordingHandler {
    served: Sender<ServedConnection>,
}

impl RecordingHandler {
    pub(crate) fn new() -> (Self, ServedLog) {
        let (served, log) = mpsc::channel();
        (Self { served }, ServedLog(log))
    }
}

impl ConnectionHandler for RecordingHandler {
    fn handle(&self, stream: ConnectionStream) {
        let transport = stream.transport();
        let mut first_line = String::new();
        // A peer that closes without writing is recorded with an empty line.
        let _ = BufReader::new(stream).read_line(&mut first_line);
        let _ = self.served.send(ServedConnection {
            transport,
            first_line: first_line.trim_end().to_owned(),
        });
    }
}

/// Receiving side of a [`RecordingHandler`].
pub(crate) struct ServedLog(Receiver<ServedConnection>);

impl ServedLog {
    const WAIT: Duration = Duration::from_secs(2);

    /// Next served connection, or `None` if none arrives in time.
    pub(crate) fn next_served(&self) -> Option<ServedConnection> {
        self.0.recv_timeout(Self::WAIT).ok()
    }

    /// Whether the handler has served nothing further.
    pub(crate) fn is_quiet(&self) -> bool {
        self.0.recv_timeout(Duration::from_millis(200)).is_err()
    }
}
