//! JSONL envelope dispatch for daemon connections.
//!
//! Each line a client sends is one protocol envelope. The line is handed to
//! the [`jmp_protocol::MessageHandler`] and exactly one response frame is
//! written back per line:
//!
//! ```json
//! {"kind":"reply","envelope":{"r":"q1","i":"bXlJZA==","t":"echo","d":"hi"}}
//! {"kind":"empty"}
//! {"kind":"error","status":422,"code":"type_validation_error","message":"..."}
//! ```
//!
//! A line longer than the configured limit is answered with a 413 error frame
//! and the connection is closed. Otherwise the connection stays open until the
//! client closes it.

mod errors;
mod handler;
mod response;
mod status;

pub(crate) use self::handler::EnvelopeConnectionHandler;
pub use self::response::ResponseFrame;
pub use self::status::{MESSAGE_TOO_LARGE_CODE, status_for};

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
