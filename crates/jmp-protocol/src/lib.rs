//! Protocol engine for the JSON Message Protocol.
//!
//! Messages travel as small JSON envelopes (see [`Envelope`]). A
//! [`MessageHandler`] takes raw input through a linear pipeline: parse, check
//! the envelope against the fixed version 1.0 meta-schema, resolve the payload
//! schema for the message type, validate the payload, hand the message to the
//! application's [`Router`], and wrap whatever the router answers in a reply
//! envelope correlated with the request.
//!
//! Payload schemas come from any [`SchemaFetcher`]. [`SchemaCache`] memoizes a
//! fetcher and collapses concurrent misses into a single fetch, and
//! [`SchemaDirectorySource`] serves `<type>.schema` files from disk, evicting
//! entries when the files change.
//!
//! ```no_run
//! use jmp_protocol::{
//!     MessageHandler, RouteError, RouteReply, RouteTable, SchemaDirectorySource,
//! };
//!
//! let routes = RouteTable::new();
//! routes.register("echo", |data: Option<serde_json::Value>| {
//!     Ok::<_, RouteError>(Some(
//!         RouteReply::new("echo").with_data(data.unwrap_or_default()),
//!     ))
//! });
//! let handler = MessageHandler::builder()
//!     .router(routes)
//!     .schema_fetcher(SchemaDirectorySource::open("schemas")?)
//!     .build()?;
//! let reply = handler.handle_message(r#"{"i":1,"t":"echo","d":"hi"}"#)?;
//! assert!(reply.is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod envelope;
mod error;
mod handler;
mod id;
mod routes;
mod schema_cache;
mod schema_directory;
mod validator;

pub use envelope::{Envelope, Identifier, ProtocolVersion};
pub use error::{ConfigurationError, ErrorKind, FetchError, ProtocolError, RouteError};
pub use handler::{MessageHandler, MessageHandlerBuilder, MessageInput};
pub use id::{IdGenerator, RANDOM_ID_BYTES, RandomIdGenerator, SequentialIdGenerator};
pub use routes::{RouteHandler, RouteReply, RouteTable, Router};
pub use schema_cache::{FetchOutcome, SchemaCache, SchemaFetcher};
pub use schema_directory::{
    DEFAULT_WATCH_INTERVAL, SCHEMA_EXTENSION, SchemaDirectorySource, schema_path,
};
pub use validator::{EnvelopeValidator, Schema, envelope_meta_schema};

#[cfg(test)]
mod tests;
