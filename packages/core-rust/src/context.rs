//! Per-request message context threaded through the dispatch pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use crate::message::{WebServiceMessage, WebServiceMessageFactory};

/// Holds exactly one request message and at most one lazily created response
/// message for a single dispatch.
///
/// The request is immutable after construction. The response is created on
/// first access through the message factory supplied at construction time;
/// every subsequent access returns the same instance. A string-keyed property
/// map lets interceptors and endpoints exchange per-request attributes.
///
/// One context serves exactly one request on one task; contexts are never
/// shared between concurrent dispatches.
pub struct MessageContext {
    request: Box<dyn WebServiceMessage>,
    response: Option<Box<dyn WebServiceMessage>>,
    factory: Arc<dyn WebServiceMessageFactory>,
    properties: HashMap<String, serde_json::Value>,
}

impl MessageContext {
    /// Create a context for the given inbound request.
    #[must_use]
    pub fn new(
        request: Box<dyn WebServiceMessage>,
        factory: Arc<dyn WebServiceMessageFactory>,
    ) -> Self {
        Self {
            request,
            response: None,
            factory,
            properties: HashMap::new(),
        }
    }

    /// The request message.
    #[must_use]
    pub fn request(&self) -> &dyn WebServiceMessage {
        self.request.as_ref()
    }

    /// Whether a response message has been created.
    #[must_use]
    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    /// The response message, if one has been created. Never creates one.
    #[must_use]
    pub fn response(&self) -> Option<&dyn WebServiceMessage> {
        self.response.as_deref()
    }

    /// The response message, created through the factory on first access.
    ///
    /// Idempotent: the same instance is returned on every call within the
    /// lifetime of this context.
    pub fn response_mut(&mut self) -> &mut dyn WebServiceMessage {
        if self.response.is_none() {
            tracing::debug!("creating response message");
            self.response = Some(self.factory.create_message());
        }
        self.response
            .as_deref_mut()
            .unwrap_or_else(|| unreachable!("response populated above"))
    }

    /// Look up a per-request property.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
        self.properties.get(name)
    }

    /// Set a per-request property, replacing any previous value.
    pub fn set_property(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.properties.insert(name.into(), value);
    }

    /// Remove a per-request property, returning its previous value.
    pub fn remove_property(&mut self, name: &str) -> Option<serde_json::Value> {
        self.properties.remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Payload;
    use crate::qname::QName;
    use crate::soap::{SoapMessage, SoapMessageFactory, SoapVersion};

    fn make_context() -> MessageContext {
        MessageContext::new(
            Box::new(SoapMessage::new(SoapVersion::Soap11)),
            Arc::new(SoapMessageFactory::new(SoapVersion::Soap11)),
        )
    }

    #[test]
    fn no_response_until_first_access() {
        let ctx = make_context();
        assert!(!ctx.has_response());
        assert!(ctx.response().is_none());
    }

    #[test]
    fn response_creation_is_idempotent() {
        let mut ctx = make_context();
        ctx.response_mut()
            .set_payload(Payload::new(QName::local("Reply"), "<Reply/>"));

        // A second access must return the same instance, payload intact.
        let root = ctx.response_mut().payload_root().cloned();
        assert_eq!(root, Some(QName::local("Reply")));
        assert!(ctx.has_response());
    }

    #[test]
    fn properties_round_trip() {
        let mut ctx = make_context();
        ctx.set_property("client.id", serde_json::json!("abc"));
        assert_eq!(ctx.property("client.id"), Some(&serde_json::json!("abc")));
        assert_eq!(ctx.remove_property("client.id"), Some(serde_json::json!("abc")));
        assert!(ctx.property("client.id").is_none());
    }
}
