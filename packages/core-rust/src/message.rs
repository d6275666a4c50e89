//! Message abstraction consumed by the dispatch core.
//!
//! The dispatcher is deliberately ignorant of concrete message
//! representations. It sees messages through `WebServiceMessage`, and
//! protocol-specific code recovers the concrete type via `as_any` downcasts.

use std::any::Any;

use serde::{Deserialize, Serialize};

use crate::qname::QName;

/// A named body payload: the qualified name of the root element plus its
/// serialized content. Content is carried verbatim; parsing it is the
/// transport/marshalling layer's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Qualified name of the payload root element.
    pub name: QName,
    /// Serialized payload content.
    pub content: String,
}

impl Payload {
    /// Create a payload with the given root name and content.
    #[must_use]
    pub fn new(name: QName, content: impl Into<String>) -> Self {
        Self {
            name,
            content: content.into(),
        }
    }
}

/// A web service message as seen by the dispatch core.
///
/// `has_fault` drives the interceptor post-phase branching between
/// `handle_response` and `handle_fault`. `payload_root` drives payload-based
/// endpoint mappings.
pub trait WebServiceMessage: Any + Send + Sync {
    /// Upcast for downcasting to a concrete message type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to a concrete message type.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Whether this message carries a protocol-level fault.
    fn has_fault(&self) -> bool {
        false
    }

    /// The body payload, if any.
    fn payload(&self) -> Option<&Payload> {
        None
    }

    /// Replace the body payload.
    fn set_payload(&mut self, payload: Payload);

    /// Qualified name of the payload root element, if a payload is present.
    fn payload_root(&self) -> Option<&QName> {
        self.payload().map(|p| &p.name)
    }
}

/// Creates empty messages of a concrete representation.
///
/// The `MessageContext` holds a factory and uses it to lazily create the
/// response message on first access.
pub trait WebServiceMessageFactory: Send + Sync {
    /// Create a new, empty message.
    fn create_message(&self) -> Box<dyn WebServiceMessage>;
}
