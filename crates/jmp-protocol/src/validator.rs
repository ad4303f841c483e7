//! JSON-Schema evaluation for envelopes and payloads.
//!
//! Envelopes are checked against a fixed draft-04 meta-schema compiled once
//! per process and shared by every handler. Payload schemas are draft-04
//! documents supplied by a fetch capability; each [`Schema`] compiles itself
//! on first use and keeps the compiled form for later messages.

use std::fmt;

use jsonschema::Validator;
use once_cell::sync::OnceCell;
use serde_json::{Value, json};

use crate::envelope::Envelope;
use crate::error::ProtocolError;

static ENVELOPE_VALIDATOR: OnceCell<EnvelopeValidator> = OnceCell::new();

/// Draft-04 meta-schema every envelope must satisfy.
#[must_use]
pub fn envelope_meta_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "type": "object",
        "properties": {
            "v": { "enum": ["1.0"] },
            "i": { "type": ["integer", "string"] },
            "r": { "type": ["integer", "string"] },
            "t": { "type": ["integer", "string"] },
            "d": {}
        },
        "additionalProperties": false,
        "required": ["t"]
    })
}

/// Stateless validator for the envelope's structural shape.
pub struct EnvelopeValidator {
    validator: Validator,
}

impl EnvelopeValidator {
    /// Returns the process-wide validator, compiling it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Internal`] if the meta-schema fails to
    /// compile.
    pub fn shared() -> Result<&'static Self, ProtocolError> {
        ENVELOPE_VALIDATOR.get_or_try_init(Self::compile)
    }

    fn compile() -> Result<Self, ProtocolError> {
        jsonschema::draft4::new(&envelope_meta_schema())
            .map(|validator| Self { validator })
            .map_err(|error| {
                ProtocolError::internal(format!("envelope meta-schema failed to compile: {error}"))
            })
    }

    /// Validates a parsed JSON object and converts it into an [`Envelope`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::EnvelopeValidation`] listing every violation
    /// of the meta-schema.
    pub fn validate(&self, value: Value) -> Result<Envelope, ProtocolError> {
        let violations = collect_violations(&self.validator, &value);
        if !violations.is_empty() {
            return Err(ProtocolError::envelope_validation(violations));
        }
        serde_json::from_value(value)
            .map_err(|error| ProtocolError::envelope_validation(vec![error.to_string()]))
    }
}

impl fmt::Debug for EnvelopeValidator {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("EnvelopeValidator").finish_non_exhaustive()
    }
}

/// A payload schema associated with one message type.
pub struct Schema {
    document: Value,
    compiled: OnceCell<Result<Validator, String>>,
}

impl Schema {
    /// Wraps a schema document. The document is not checked until first use.
    #[must_use]
    pub fn new(document: Value) -> Self {
        Self {
            document,
            compiled: OnceCell::new(),
        }
    }

    /// The raw schema document.
    #[must_use]
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Lists the ways `instance` violates the schema; empty when it conforms.
    ///
    /// # Errors
    ///
    /// Returns the compiler diagnostic if the document is not a usable
    /// draft-04 schema.
    pub fn violations(&self, instance: &Value) -> Result<Vec<String>, String> {
        let compiled = self.compiled.get_or_init(|| {
            jsonschema::draft4::new(&self.document).map_err(|error| error.to_string())
        });
        match compiled {
            Ok(validator) => Ok(collect_violations(validator, instance)),
            Err(message) => Err(message.clone()),
        }
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Schema")
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.document == other.document
    }
}

impl From<Value> for Schema {
    fn from(document: Value) -> Self {
        Self::new(document)
    }
}

fn collect_violations(validator: &Validator, instance: &Value) -> Vec<String> {
    validator
        .iter_errors(instance)
        .map(|error| {
            let path = error.instance_path.to_string();
            if path.is_empty() {
                error.to_string()
            } else {
                format!("{path}: {error}")
            }
        })
        .collect()
}
