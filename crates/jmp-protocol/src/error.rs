//! Error types raised while configuring and running the protocol engine.
//!
//! Failures fall into four families: construction-time configuration errors,
//! schema fetch errors reported by a fetch capability, opaque router errors
//! owned by the embedding application, and the [`ProtocolError`] that
//! terminates the handling of a single message.

use std::error::Error as StdError;

use thiserror::Error;

use crate::envelope::Identifier;

/// Errors raised while assembling protocol components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A message handler was built without a router capability.
    #[error("a router capability is required to handle messages")]
    MissingRouter,

    /// A component was given unusable settings.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        /// Description of the rejected setting.
        message: String,
    },
}

impl ConfigurationError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}

/// Errors reported by a schema fetch capability.
///
/// The type is cloneable so that every caller waiting on the same in-flight
/// fetch receives the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The source cannot resolve or read a schema for the type.
    #[error("unknown message type '{message_type}'")]
    UnknownMessageType {
        /// Type that was looked up.
        message_type: String,
    },

    /// The source failed for a reason other than an unknown type.
    #[error("schema for '{message_type}' is unavailable: {message}")]
    Unavailable {
        /// Type that was looked up.
        message_type: String,
        /// Description of the failure.
        message: String,
    },

    /// The schema document could not be compiled.
    #[error("schema for '{message_type}' is not a usable JSON schema: {message}")]
    InvalidSchema {
        /// Type whose schema was rejected.
        message_type: String,
        /// Compiler diagnostic.
        message: String,
    },

    /// The fetch that this caller was waiting on never completed.
    #[error("schema fetch for '{message_type}' was interrupted")]
    Interrupted {
        /// Type that was being fetched.
        message_type: String,
    },
}

impl FetchError {
    /// Creates an unknown message type error.
    #[must_use]
    pub fn unknown_message_type(message_type: &Identifier) -> Self {
        Self::UnknownMessageType {
            message_type: message_type.to_string(),
        }
    }

    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(message_type: &Identifier, message: impl Into<String>) -> Self {
        Self::Unavailable {
            message_type: message_type.to_string(),
            message: message.into(),
        }
    }

    /// Creates an invalid schema error.
    #[must_use]
    pub fn invalid_schema(message_type: &Identifier, message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message_type: message_type.to_string(),
            message: message.into(),
        }
    }

    /// Creates an interrupted error.
    #[must_use]
    pub fn interrupted(message_type: &Identifier) -> Self {
        Self::Interrupted {
            message_type: message_type.to_string(),
        }
    }
}

/// Opaque error raised by a router capability.
///
/// The protocol engine never inspects router errors; it hands them back to the
/// caller unchanged.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct RouteError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl RouteError {
    /// Creates a router error with a description.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps an application error, keeping it reachable through `source()`.
    pub fn from_source<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates the error a route table reports for an unregistered type.
    #[must_use]
    pub fn unknown_message_type(message_type: &Identifier) -> Self {
        Self::new(format!("unknown message type '{message_type}'"))
    }

    /// Human-readable description supplied by the router.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Machine-readable classification of a [`ProtocolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input was not valid JSON.
    Parse,
    /// Input was JSON but not an object.
    InvalidEnvelope,
    /// The object violated the envelope meta-schema.
    EnvelopeValidation,
    /// The type's schema could not be fetched.
    SchemaFetch,
    /// The payload violated the type's schema.
    TypeValidation,
    /// The router reported a failure.
    Route,
    /// The engine itself failed.
    Internal,
}

impl ErrorKind {
    /// Stable snake-case code for wire formats and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parse => "parse_error",
            Self::InvalidEnvelope => "invalid_envelope",
            Self::EnvelopeValidation => "envelope_validation_error",
            Self::SchemaFetch => "schema_fetch_error",
            Self::TypeValidation => "type_validation_error",
            Self::Route => "route_error",
            Self::Internal => "internal_error",
        }
    }
}

/// Terminal failure while handling a single message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Textual input could not be parsed as JSON.
    #[error("message is not valid JSON: {source}")]
    Parse {
        /// Underlying parser error.
        #[source]
        source: serde_json::Error,
    },

    /// Parsed input was not a JSON object.
    #[error("message must be a JSON object, found {found}")]
    InvalidEnvelope {
        /// JSON kind that was found instead.
        found: &'static str,
    },

    /// The envelope does not conform to the protocol meta-schema.
    #[error(
        "message does not conform to version 1.0 of the JSON Message Protocol: {}",
        .violations.join("; ")
    )]
    EnvelopeValidation {
        /// Individual schema violations.
        violations: Vec<String>,
    },

    /// The fetch capability failed to supply the type's schema.
    #[error("schema for message type '{message_type}' could not be fetched: {source}")]
    SchemaFetch {
        /// Type whose schema was requested.
        message_type: Identifier,
        /// Error reported by the fetch capability.
        #[source]
        source: FetchError,
    },

    /// The payload does not conform to the type's schema.
    #[error(
        "payload of message type '{message_type}' failed schema validation: {}",
        .violations.join("; ")
    )]
    TypeValidation {
        /// Type whose schema rejected the payload.
        message_type: Identifier,
        /// Individual schema violations.
        violations: Vec<String>,
    },

    /// The router reported an error; passed through unchanged.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// The engine failed for a reason unrelated to the message.
    #[error("internal protocol error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl ProtocolError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } => ErrorKind::Parse,
            Self::InvalidEnvelope { .. } => ErrorKind::InvalidEnvelope,
            Self::EnvelopeValidation { .. } => ErrorKind::EnvelopeValidation,
            Self::SchemaFetch { .. } => ErrorKind::SchemaFetch,
            Self::TypeValidation { .. } => ErrorKind::TypeValidation,
            Self::Route(_) => ErrorKind::Route,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Creates an envelope validation error.
    #[must_use]
    pub const fn envelope_validation(violations: Vec<String>) -> Self {
        Self::EnvelopeValidation { violations }
    }

    /// Creates a schema fetch error.
    #[must_use]
    pub const fn schema_fetch(message_type: Identifier, source: FetchError) -> Self {
        Self::SchemaFetch {
            message_type,
            source,
        }
    }

    /// Creates a type validation error.
    #[must_use]
    pub const fn type_validation(message_type: Identifier, violations: Vec<String>) -> Self {
        Self::TypeValidation {
            message_type,
            violations,
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
