//! The wire envelope.
//!
//! Every message travels as a closed JSON object with the single-letter fields
//! `v` (protocol version), `i` (message id), `r` (reply-to id), `t` (message
//! type) and `d` (payload):
//!
//! ```json
//! {"v":"1.0","i":"q7","t":"echo","d":"hi"}
//! {"r":"q7","t":"echo","d":"hi"}
//! ```
//!
//! An envelope without `r` is a request or notification; an envelope carrying
//! `r` is the reply to the request whose `i` it names.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Integer-or-string key used for message types and correlation ids.
///
/// Any JSON integer that fits in 64 bits is accepted; values above
/// `i64::MAX` are held as [`Identifier::Unsigned`] so they round-trip
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    /// Integral JSON number in the `i64` range.
    Integer(i64),
    /// Integral JSON number above `i64::MAX`.
    Unsigned(u64),
    /// JSON string.
    Text(String),
}

impl Identifier {
    /// Returns the text when the identifier is a string.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Integer(_) | Self::Unsigned(_) => None,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::Unsigned(value) => write!(formatter, "{value}"),
            Self::Text(text) => formatter.write_str(text),
        }
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u64> for Identifier {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::Unsigned(value), Self::Integer)
    }
}

/// Protocol versions an envelope may declare in `v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// Version `"1.0"`, the only published version.
    #[serde(rename = "1.0")]
    V1,
}

impl ProtocolVersion {
    /// Wire representation of the version.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "1.0",
        }
    }
}

/// A validated protocol envelope.
///
/// A `d` of JSON `null` and an absent `d` are indistinguishable once parsed;
/// both surface as `data == None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Envelope {
    /// Declared protocol version (`v`).
    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<ProtocolVersion>,
    /// Message identifier (`i`).
    #[serde(rename = "i", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Identifier>,
    /// Identifier of the request this envelope answers (`r`).
    #[serde(rename = "r", default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Identifier>,
    /// Message type (`t`).
    #[serde(rename = "t")]
    pub message_type: Identifier,
    /// Payload (`d`).
    #[serde(rename = "d", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    /// Creates an envelope carrying only a message type.
    #[must_use]
    pub fn new(message_type: impl Into<Identifier>) -> Self {
        Self {
            version: None,
            id: None,
            reply_to: None,
            message_type: message_type.into(),
            data: None,
        }
    }

    /// Sets the payload; a JSON `null` leaves `d` absent.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data).filter(|value| !value.is_null());
        self
    }

    /// Sets the message identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<Identifier>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Marks the envelope as a reply to `request_id`.
    #[must_use]
    pub fn in_reply_to(mut self, request_id: impl Into<Identifier>) -> Self {
        self.reply_to = Some(request_id.into());
        self
    }

    /// Declares protocol version 1.0.
    #[must_use]
    pub const fn with_version(mut self) -> Self {
        self.version = Some(ProtocolVersion::V1);
        self
    }

    /// Returns `true` when the envelope answers an earlier request.
    #[must_use]
    pub const fn is_reply(&self) -> bool {
        self.reply_to.is_some()
    }
}
