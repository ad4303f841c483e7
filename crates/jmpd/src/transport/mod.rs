//! Socket transport for the daemon.
//!
//! [`SocketListener`] binds the configured TCP or Unix endpoint and accepts
//! connections on a background thread; each accepted connection is handed to
//! a [`ConnectionHandler`] on its own thread.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod recording;

pub use self::errors::ListenerError;
pub(crate) use self::handler::{ConnectionHandler, ConnectionStream};
pub use self::listener::ListenerHandle;
pub(crate) use self::listener::SocketListener;
#[cfg(test)]
pub(crate) use self::recording::{RecordingHandler, ServedConnection, ServedLog};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
