//! The message handling state machine.
//!
//! [`MessageHandler::handle_message`] runs each message through a fixed
//! sequence of stages:
//!
//! 1. parse the input as JSON and require an object,
//! 2. validate the envelope against the protocol meta-schema,
//! 3. resolve the payload schema for the message type (when a schema fetcher
//!    is configured),
//! 4. validate the payload against that schema,
//! 5. route the message to the application's router,
//! 6. build the reply envelope.
//!
//! Every stage either advances or ends the handling of the message with a
//! [`ProtocolError`]; nothing is retried.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::envelope::{Envelope, Identifier};
use crate::error::{ConfigurationError, FetchError, ProtocolError};
use crate::id::IdGenerator;
use crate::routes::{RouteReply, Router};
use crate::schema_cache::SchemaFetcher;
use crate::validator::{EnvelopeValidator, Schema};

const HANDLER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::handler");

/// Raw input accepted by [`MessageHandler::handle_message`].
#[derive(Debug, Clone, PartialEq)]
pub enum MessageInput<'a> {
    /// JSON text.
    Text(&'a str),
    /// UTF-8 encoded JSON text.
    Bytes(&'a [u8]),
    /// An already parsed JSON value.
    Value(Value),
}

impl<'a> From<&'a str> for MessageInput<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a String> for MessageInput<'a> {
    fn from(text: &'a String) -> Self {
        Self::Text(text)
    }
}

impl<'a> From<&'a [u8]> for MessageInput<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Value> for MessageInput<'_> {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Validates incoming envelopes, routes them, and builds replies.
#[derive(Clone)]
pub struct MessageHandler {
    router: Arc<dyn Router>,
    schemas: Option<Arc<dyn SchemaFetcher>>,
    id_generator: Option<Arc<dyn IdGenerator>>,
}

impl MessageHandler {
    /// Starts building a handler.
    #[must_use]
    pub fn builder() -> MessageHandlerBuilder {
        MessageHandlerBuilder::default()
    }

    /// Handles one message, returning the reply envelope if the router
    /// produced one.
    ///
    /// # Errors
    ///
    /// Returns the [`ProtocolError`] of the first stage that rejected the
    /// message. Router errors are passed through as [`ProtocolError::Route`].
    pub fn handle_message<'a>(
        &self,
        input: impl Into<MessageInput<'a>>,
    ) -> Result<Option<Envelope>, ProtocolError> {
        let value = parse(input.into())?;
        let envelope = validate_envelope(value)?;
        let schema = self.resolve_schema(&envelope.message_type)?;
        if let Some(schema) = schema {
            validate_payload(&envelope, &schema)?;
        }
        let Envelope {
            id,
            message_type,
            data,
            ..
        } = envelope;
        let Some(reply) = self.route(&message_type, data)? else {
            debug!(target: HANDLER_TARGET, %message_type, "handled without reply");
            return Ok(None);
        };
        Ok(Some(self.build_reply(reply, id)))
    }

    fn resolve_schema(
        &self,
        message_type: &Identifier,
    ) -> Result<Option<Arc<Schema>>, ProtocolError> {
        let Some(schemas) = self.schemas.as_ref() else {
            return Ok(None);
        };
        match schemas.fetch(message_type) {
            Ok(Some(schema)) => Ok(Some(schema)),
            Ok(None) => {
                debug!(
                    target: HANDLER_TARGET,
                    %message_type,
                    "no schema for message type; payload not validated"
                );
                Ok(None)
            }
            Err(error) => {
                warn!(target: HANDLER_TARGET, %message_type, %error, "schema fetch failed");
                Err(ProtocolError::schema_fetch(message_type.clone(), error))
            }
        }
    }

    fn route(
        &self,
        message_type: &Identifier,
        data: Option<Value>,
    ) -> Result<Option<RouteReply>, ProtocolError> {
        debug!(target: HANDLER_TARGET, %message_type, "routing message");
        self.router.route(message_type, data).map_err(|error| {
            warn!(target: HANDLER_TARGET, %message_type, %error, "router reported an error");
            ProtocolError::Route(error)
        })
    }

    fn build_reply(&self, reply: RouteReply, request_id: Option<Identifier>) -> Envelope {
        let RouteReply { message_type, data } = reply;
        Envelope {
            version: None,
            id: self.id_generator.as_ref().map(|generator| generator.next_id()),
            reply_to: request_id,
            message_type,
            data: data.filter(|value| !value.is_null()),
        }
    }
}

fn parse(input: MessageInput<'_>) -> Result<Value, ProtocolError> {
    let value = match input {
        MessageInput::Text(text) => serde_json::from_str(text),
        MessageInput::Bytes(bytes) => serde_json::from_slice(bytes),
        MessageInput::Value(value) => Ok(value),
    }
    .map_err(|source| {
        debug!(target: HANDLER_TARGET, error = %source, "message is not valid JSON");
        ProtocolError::Parse { source }
    })?;

    if value.is_object() {
        Ok(value)
    } else {
        let found = json_kind(&value);
        debug!(target: HANDLER_TARGET, found, "message is not a JSON object");
        Err(ProtocolError::InvalidEnvelope { found })
    }
}

fn validate_envelope(value: Value) -> Result<Envelope, ProtocolError> {
    EnvelopeValidator::shared()?
        .validate(value)
        .inspect_err(|error| {
            debug!(target: HANDLER_TARGET, %error, "envelope rejected");
        })
}

fn validate_payload(envelope: &Envelope, schema: &Schema) -> Result<(), ProtocolError> {
    let message_type = &envelope.message_type;
    let instance = envelope.data.as_ref().unwrap_or(&Value::Null);
    let violations = schema.violations(instance).map_err(|message| {
        warn!(target: HANDLER_TARGET, %message_type, %message, "schema does not compile");
        ProtocolError::schema_fetch(
            message_type.clone(),
            FetchError::invalid_schema(message_type, message),
        )
    })?;
    if violations.is_empty() {
        return Ok(());
    }
    debug!(
        target: HANDLER_TARGET,
        %message_type,
        violations = violations.len(),
        "payload rejected"
    );
    Err(ProtocolError::type_validation(
        message_type.clone(),
        violations,
    ))
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Assembles a [`MessageHandler`].
#[derive(Default)]
pub struct MessageHandlerBuilder {
    router: Option<Arc<dyn Router>>,
    schemas: Option<Arc<dyn SchemaFetcher>>,
    id_generator: Option<Arc<dyn IdGenerator>>,
}

impl MessageHandlerBuilder {
    /// Sets the router capability. Required.
    #[must_use]
    pub fn router(self, router: impl Router + 'static) -> Self {
        self.shared_router(Arc::new(router))
    }

    /// Sets a router that is shared with other owners.
    #[must_use]
    pub fn shared_router(mut self, router: Arc<dyn Router>) -> Self {
        self.router = Some(router);
        self
    }

    /// Sets the schema fetch capability. Without one, payloads are not
    /// validated.
    #[must_use]
    pub fn schema_fetcher(self, schemas: impl SchemaFetcher + 'static) -> Self {
        self.shared_schema_fetcher(Arc::new(schemas))
    }

    /// Sets a schema fetcher that is shared with other owners.
    #[must_use]
    pub fn shared_schema_fetcher(mut self, schemas: Arc<dyn SchemaFetcher>) -> Self {
        self.schemas = Some(schemas);
        self
    }

    /// Sets the generator for reply identifiers. Without one, replies carry
    /// no `i`.
    #[must_use]
    pub fn id_generator(mut self, generator: impl IdGenerator + 'static) -> Self {
        self.id_generator = Some(Arc::new(generator));
        self
    }

    /// Builds the handler.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::MissingRouter`] when no router was set.
    pub fn build(self) -> Result<MessageHandler, ConfigurationError> {
        let router = self.router.ok_or(ConfigurationError::MissingRouter)?;
        Ok(MessageHandler {
            router,
            schemas: self.schemas,
            id_generator: self.id_generator,
        })
    }
}
