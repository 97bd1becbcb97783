//! Message definitions for the relay
//!
//! `Envelope` is the wire representation browsers exchange. The hub itself
//! never parses client frames; envelopes are built server-side only for
//! upload announcements, and by tests.
//!
//! Wire format, in this field order:
//! `{"id":"..","type":"message"|"link"|..,"from":"..","data":".."}`

use serde::{Deserialize, Serialize};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

/// Discriminator carried in the `type` field.
///
/// Unknown values are kept as `Other` so envelopes from newer clients
/// survive a round trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    Message,
    Link,
    Other(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Message => "message",
            MessageKind::Link => "link",
            MessageKind::Other(kind) => kind,
        }
    }
}

impl From<String> for MessageKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "message" => MessageKind::Message,
            "link" => MessageKind::Link,
            _ => MessageKind::Other(kind),
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Other(kind) => kind,
            known => known.as_str().to_string(),
        }
    }
}

/// Immutable once built; serialize it once with `to_frame` and hand the
/// same frame to every recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    id: String,
    #[serde(rename = "type")]
    kind: MessageKind,
    from: String,
    data: String,
}

impl Envelope {
    pub fn new(
        id: impl Into<String>,
        kind: MessageKind,
        from: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            from: from.into(),
            data: data.into(),
        }
    }

    /// A chat text message with a freshly generated id.
    pub fn message(from: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), MessageKind::Message, from, text)
    }

    /// A download announcement for `path` with a freshly generated id.
    pub fn link(from: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), MessageKind::Link, from, path)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    /// The `from` field: whatever sender id the originator supplied.
    pub fn sender(&self) -> &str {
        &self.from
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serializes the envelope into a single text frame.
    pub fn to_frame(&self) -> serde_json::Result<WsMessage> {
        Ok(WsMessage::text(self.to_json()?))
    }

    pub fn parse(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
