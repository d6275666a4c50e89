//! In-memory SOAP envelope model for versions 1.1 and 1.2.
//!
//! Models only what the dispatch core needs: headers with mustUnderstand and
//! actor/role attributes, a body holding either a payload or a fault, and
//! version-correct fault codes and role URIs. Serialization to XML is the
//! transport layer's job.

use std::any::Any;

use crate::message::{Payload, WebServiceMessage, WebServiceMessageFactory};
use crate::qname::QName;

const SOAP_11_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const SOAP_11_ACTOR_NEXT: &str = "http://schemas.xmlsoap.org/soap/actor/next";

const SOAP_12_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
const SOAP_12_ROLE_NEXT: &str = "http://www.w3.org/2003/05/soap-envelope/role/next";
const SOAP_12_ROLE_ULTIMATE_RECEIVER: &str =
    "http://www.w3.org/2003/05/soap-envelope/role/ultimateReceiver";
const SOAP_12_ROLE_NONE: &str = "http://www.w3.org/2003/05/soap-envelope/role/none";

// ---------------------------------------------------------------------------
// SoapVersion
// ---------------------------------------------------------------------------

/// SOAP protocol version of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoapVersion {
    Soap11,
    Soap12,
}

impl SoapVersion {
    /// Envelope namespace URI for this version.
    #[must_use]
    pub fn envelope_namespace(self) -> &'static str {
        match self {
            Self::Soap11 => SOAP_11_ENVELOPE_NS,
            Self::Soap12 => SOAP_12_ENVELOPE_NS,
        }
    }

    /// The actor (1.1) or role (1.2) URI addressing the next node on the
    /// message path.
    #[must_use]
    pub fn next_role(self) -> &'static str {
        match self {
            Self::Soap11 => SOAP_11_ACTOR_NEXT,
            Self::Soap12 => SOAP_12_ROLE_NEXT,
        }
    }

    /// The role URI addressing the ultimate receiver. SOAP 1.1 has no such
    /// URI; the default (empty) actor addresses the ultimate destination.
    #[must_use]
    pub fn ultimate_receiver_role(self) -> Option<&'static str> {
        match self {
            Self::Soap11 => None,
            Self::Soap12 => Some(SOAP_12_ROLE_ULTIMATE_RECEIVER),
        }
    }

    /// The role URI addressing no node at all (SOAP 1.2 only).
    #[must_use]
    pub fn none_role(self) -> Option<&'static str> {
        match self {
            Self::Soap11 => None,
            Self::Soap12 => Some(SOAP_12_ROLE_NONE),
        }
    }
}

// ---------------------------------------------------------------------------
// Fault codes
// ---------------------------------------------------------------------------

/// Abstract fault code, rendered to the version-correct qualified name.
///
/// SOAP 1.1 calls the sender/receiver codes `Client`/`Server`; SOAP 1.2 calls
/// them `Sender`/`Receiver`. Code here is abstract so resolvers can build
/// faults without knowing which version is in play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultCode {
    /// The message was malformed or otherwise the sender's mistake.
    Sender,
    /// The receiving node failed to process a well-formed message.
    Receiver,
    /// A mandatory header block was not understood.
    MustUnderstand,
    /// The envelope namespace did not match the expected version.
    VersionMismatch,
    /// An application-defined code.
    Custom(QName),
}

impl FaultCode {
    /// The qualified name of this code under the given SOAP version.
    #[must_use]
    pub fn to_qname(&self, version: SoapVersion) -> QName {
        let ns = version.envelope_namespace();
        match (self, version) {
            (Self::Sender, SoapVersion::Soap11) => QName::new(ns, "Client"),
            (Self::Sender, SoapVersion::Soap12) => QName::new(ns, "Sender"),
            (Self::Receiver, SoapVersion::Soap11) => QName::new(ns, "Server"),
            (Self::Receiver, SoapVersion::Soap12) => QName::new(ns, "Receiver"),
            (Self::MustUnderstand, _) => QName::new(ns, "MustUnderstand"),
            (Self::VersionMismatch, _) => QName::new(ns, "VersionMismatch"),
            (Self::Custom(name), _) => name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// SoapFault
// ---------------------------------------------------------------------------

/// A protocol-level fault carried in a SOAP body.
#[derive(Debug, Clone)]
pub struct SoapFault {
    code: FaultCode,
    fault_string: String,
    lang: String,
    role: Option<String>,
    detail: Option<serde_json::Value>,
}

impl SoapFault {
    /// Create a fault with the given code and reason text in English.
    #[must_use]
    pub fn new(code: FaultCode, fault_string: impl Into<String>) -> Self {
        Self {
            code,
            fault_string: fault_string.into(),
            lang: "en".to_string(),
            role: None,
            detail: None,
        }
    }

    /// The abstract fault code.
    #[must_use]
    pub fn code(&self) -> &FaultCode {
        &self.code
    }

    /// The reason text.
    #[must_use]
    pub fn fault_string(&self) -> &str {
        &self.fault_string
    }

    /// Language of the reason text (`xml:lang`).
    #[must_use]
    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// The faulting actor (1.1) or role (1.2) URI, if set.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Structured detail content, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&serde_json::Value> {
        self.detail.as_ref()
    }

    /// Set the language of the reason text.
    pub fn set_lang(&mut self, lang: impl Into<String>) {
        self.lang = lang.into();
    }

    /// Set the faulting actor/role URI.
    pub fn set_role(&mut self, role: impl Into<String>) {
        self.role = Some(role.into());
    }

    /// Attach structured detail content summarizing the failure.
    pub fn set_detail(&mut self, detail: serde_json::Value) {
        self.detail = Some(detail);
    }
}

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

/// A single header block in a SOAP envelope.
#[derive(Debug, Clone)]
pub struct SoapHeaderElement {
    name: QName,
    must_understand: bool,
    role: Option<String>,
    content: String,
}

impl SoapHeaderElement {
    /// Create a header block with the given name and empty content.
    #[must_use]
    pub fn new(name: QName) -> Self {
        Self {
            name,
            must_understand: false,
            role: None,
            content: String::new(),
        }
    }

    /// Qualified name of the header block.
    #[must_use]
    pub fn name(&self) -> &QName {
        &self.name
    }

    /// Whether the block carries `mustUnderstand="1"`.
    #[must_use]
    pub fn must_understand(&self) -> bool {
        self.must_understand
    }

    /// The actor (1.1) or role (1.2) URI, if present. Absent means the
    /// default actor/role.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Serialized content of the block.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Mark the block as mustUnderstand.
    #[must_use]
    pub fn with_must_understand(mut self, must_understand: bool) -> Self {
        self.must_understand = must_understand;
        self
    }

    /// Address the block at the given actor/role URI.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the serialized content of the block.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}

/// The header of a SOAP envelope: an ordered list of header blocks.
#[derive(Debug, Clone, Default)]
pub struct SoapHeader {
    elements: Vec<SoapHeaderElement>,
}

impl SoapHeader {
    /// All header blocks in document order.
    #[must_use]
    pub fn elements(&self) -> &[SoapHeaderElement] {
        &self.elements
    }

    /// Append a header block.
    pub fn add_element(&mut self, element: SoapHeaderElement) {
        self.elements.push(element);
    }

    /// Select the header blocks targeted at a node acting in the given
    /// actor/role URIs.
    ///
    /// SOAP 1.1: blocks with no actor (the default actor addresses the
    /// ultimate destination), the `next` actor, or an actor in `roles`.
    ///
    /// SOAP 1.2: blocks with the `next` role always; no role or the
    /// `ultimateReceiver` role only when `ultimate_receiver` is true; the
    /// `none` role never; otherwise a role in `roles`.
    #[must_use]
    pub fn elements_to_process(
        &self,
        version: SoapVersion,
        roles: &[String],
        ultimate_receiver: bool,
    ) -> Vec<&SoapHeaderElement> {
        self.elements
            .iter()
            .filter(|element| {
                Self::targets_node(version, element.role(), roles, ultimate_receiver)
            })
            .collect()
    }

    fn targets_node(
        version: SoapVersion,
        role: Option<&str>,
        roles: &[String],
        ultimate_receiver: bool,
    ) -> bool {
        let role = role.unwrap_or("");
        match version {
            SoapVersion::Soap11 => {
                role.is_empty()
                    || role == SOAP_11_ACTOR_NEXT
                    || roles.iter().any(|r| r == role)
            }
            SoapVersion::Soap12 => {
                if role == SOAP_12_ROLE_NONE {
                    false
                } else if role == SOAP_12_ROLE_NEXT {
                    true
                } else if role.is_empty() || role == SOAP_12_ROLE_ULTIMATE_RECEIVER {
                    ultimate_receiver
                } else {
                    roles.iter().any(|r| r == role)
                }
            }
        }
    }

    /// Add a SOAP 1.2 `NotUnderstood` header entry naming a header block
    /// that was not understood.
    pub fn add_not_understood(&mut self, header_name: QName) {
        let element = SoapHeaderElement::new(QName::new(SOAP_12_ENVELOPE_NS, "NotUnderstood"))
            .with_content(header_name.to_string());
        self.elements.push(element);
    }
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// The body of a SOAP envelope: a payload, a fault, or empty.
#[derive(Debug, Clone, Default)]
pub struct SoapBody {
    payload: Option<Payload>,
    fault: Option<SoapFault>,
}

impl SoapBody {
    /// The body payload, if any. A body carrying a fault has no payload.
    #[must_use]
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Replace the body payload.
    pub fn set_payload(&mut self, payload: Payload) {
        self.payload = Some(payload);
    }

    /// The fault, if one has been added.
    #[must_use]
    pub fn fault(&self) -> Option<&SoapFault> {
        self.fault.as_ref()
    }

    /// Whether the body carries a fault.
    #[must_use]
    pub fn has_fault(&self) -> bool {
        self.fault.is_some()
    }

    /// Add a fault with the given code and reason text, replacing any
    /// existing body content.
    pub fn add_fault(
        &mut self,
        code: FaultCode,
        fault_string: impl Into<String>,
    ) -> &mut SoapFault {
        self.payload = None;
        self.fault = Some(SoapFault::new(code, fault_string));
        self.fault
            .as_mut()
            .unwrap_or_else(|| unreachable!("fault set above"))
    }

    /// Add a fault blaming the message sender.
    pub fn add_sender_fault(&mut self, fault_string: impl Into<String>) -> &mut SoapFault {
        self.add_fault(FaultCode::Sender, fault_string)
    }

    /// Add a fault blaming the receiving node.
    pub fn add_receiver_fault(&mut self, fault_string: impl Into<String>) -> &mut SoapFault {
        self.add_fault(FaultCode::Receiver, fault_string)
    }

    /// Add a mustUnderstand fault with reason text in the given language.
    pub fn add_must_understand_fault(
        &mut self,
        fault_string: impl Into<String>,
        lang: impl Into<String>,
    ) -> &mut SoapFault {
        let fault = self.add_fault(FaultCode::MustUnderstand, fault_string);
        fault.set_lang(lang);
        fault
    }
}

// ---------------------------------------------------------------------------
// SoapMessage
// ---------------------------------------------------------------------------

/// A SOAP envelope: version, optional SOAPAction, header, and body.
#[derive(Debug, Clone)]
pub struct SoapMessage {
    version: SoapVersion,
    soap_action: Option<String>,
    header: SoapHeader,
    body: SoapBody,
}

impl SoapMessage {
    /// Create an empty envelope of the given version.
    #[must_use]
    pub fn new(version: SoapVersion) -> Self {
        Self {
            version,
            soap_action: None,
            header: SoapHeader::default(),
            body: SoapBody::default(),
        }
    }

    /// The SOAP version of this envelope.
    #[must_use]
    pub fn version(&self) -> SoapVersion {
        self.version
    }

    /// The SOAPAction transport value, if present.
    #[must_use]
    pub fn soap_action(&self) -> Option<&str> {
        self.soap_action.as_deref()
    }

    /// Set the SOAPAction transport value.
    pub fn set_soap_action(&mut self, action: impl Into<String>) {
        self.soap_action = Some(action.into());
    }

    /// The envelope header.
    #[must_use]
    pub fn header(&self) -> &SoapHeader {
        &self.header
    }

    /// Mutable access to the envelope header.
    pub fn header_mut(&mut self) -> &mut SoapHeader {
        &mut self.header
    }

    /// The envelope body.
    #[must_use]
    pub fn body(&self) -> &SoapBody {
        &self.body
    }

    /// Mutable access to the envelope body.
    pub fn body_mut(&mut self) -> &mut SoapBody {
        &mut self.body
    }
}

impl WebServiceMessage for SoapMessage {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn has_fault(&self) -> bool {
        self.body.has_fault()
    }

    fn payload(&self) -> Option<&Payload> {
        self.body.payload()
    }

    fn set_payload(&mut self, payload: Payload) {
        self.body.set_payload(payload);
    }
}

/// Factory producing empty SOAP envelopes of a fixed version.
#[derive(Debug, Clone)]
pub struct SoapMessageFactory {
    version: SoapVersion,
}

impl SoapMessageFactory {
    /// Create a factory for the given SOAP version.
    #[must_use]
    pub fn new(version: SoapVersion) -> Self {
        Self { version }
    }
}

impl WebServiceMessageFactory for SoapMessageFactory {
    fn create_message(&self) -> Box<dyn WebServiceMessage> {
        Box::new(SoapMessage::new(self.version))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_codes_render_version_correct_names() {
        assert_eq!(
            FaultCode::Sender.to_qname(SoapVersion::Soap11),
            QName::new(SOAP_11_ENVELOPE_NS, "Client")
        );
        assert_eq!(
            FaultCode::Sender.to_qname(SoapVersion::Soap12),
            QName::new(SOAP_12_ENVELOPE_NS, "Sender")
        );
        assert_eq!(
            FaultCode::Receiver.to_qname(SoapVersion::Soap11),
            QName::new(SOAP_11_ENVELOPE_NS, "Server")
        );
        assert_eq!(
            FaultCode::Receiver.to_qname(SoapVersion::Soap12),
            QName::new(SOAP_12_ENVELOPE_NS, "Receiver")
        );
        assert_eq!(
            FaultCode::MustUnderstand.to_qname(SoapVersion::Soap12),
            QName::new(SOAP_12_ENVELOPE_NS, "MustUnderstand")
        );
    }

    #[test]
    fn adding_fault_clears_payload() {
        let mut body = SoapBody::default();
        body.set_payload(Payload::new(QName::local("Echo"), "<Echo/>"));
        body.add_receiver_fault("boom");
        assert!(body.has_fault());
        assert!(body.payload().is_none());
    }

    #[test]
    fn must_understand_fault_carries_lang() {
        let mut body = SoapBody::default();
        body.add_must_understand_fault("not understood", "en");
        let fault = body.fault().unwrap();
        assert_eq!(fault.code(), &FaultCode::MustUnderstand);
        assert_eq!(fault.lang(), "en");
    }

    #[test]
    fn soap11_default_actor_and_next_are_processed() {
        let mut header = SoapHeader::default();
        header.add_element(SoapHeaderElement::new(QName::local("a")));
        header.add_element(
            SoapHeaderElement::new(QName::local("b")).with_role(SOAP_11_ACTOR_NEXT),
        );
        header.add_element(
            SoapHeaderElement::new(QName::local("c")).with_role("urn:other-actor"),
        );

        let to_process = header.elements_to_process(SoapVersion::Soap11, &[], true);
        let names: Vec<&str> = to_process.iter().map(|e| e.name().local_part()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn soap11_configured_actor_is_processed() {
        let mut header = SoapHeader::default();
        header.add_element(
            SoapHeaderElement::new(QName::local("c")).with_role("urn:other-actor"),
        );
        let roles = vec!["urn:other-actor".to_string()];
        let to_process = header.elements_to_process(SoapVersion::Soap11, &roles, true);
        assert_eq!(to_process.len(), 1);
    }

    #[test]
    fn soap12_role_selection() {
        let mut header = SoapHeader::default();
        header.add_element(SoapHeaderElement::new(QName::local("default")));
        header.add_element(
            SoapHeaderElement::new(QName::local("next")).with_role(SOAP_12_ROLE_NEXT),
        );
        header.add_element(
            SoapHeaderElement::new(QName::local("ultimate"))
                .with_role(SOAP_12_ROLE_ULTIMATE_RECEIVER),
        );
        header.add_element(
            SoapHeaderElement::new(QName::local("none")).with_role(SOAP_12_ROLE_NONE),
        );

        // As ultimate receiver: everything except the "none" role.
        let names: Vec<&str> = header
            .elements_to_process(SoapVersion::Soap12, &[], true)
            .iter()
            .map(|e| e.name().local_part())
            .collect();
        assert_eq!(names, vec!["default", "next", "ultimate"]);

        // As intermediary: only the "next" role.
        let names: Vec<&str> = header
            .elements_to_process(SoapVersion::Soap12, &[], false)
            .iter()
            .map(|e| e.name().local_part())
            .collect();
        assert_eq!(names, vec!["next"]);
    }

    #[test]
    fn not_understood_entries_name_the_header() {
        let mut header = SoapHeader::default();
        header.add_not_understood(QName::new("urn:example", "Security"));
        let element = &header.elements()[0];
        assert_eq!(element.name().local_part(), "NotUnderstood");
        assert_eq!(element.content(), "{urn:example}Security");
    }

    #[test]
    fn message_has_fault_reflects_body() {
        let mut msg = SoapMessage::new(SoapVersion::Soap11);
        assert!(!WebServiceMessage::has_fault(&msg));
        msg.body_mut().add_sender_fault("bad request");
        assert!(WebServiceMessage::has_fault(&msg));
    }

    #[test]
    fn factory_produces_empty_messages_of_version() {
        let factory = SoapMessageFactory::new(SoapVersion::Soap12);
        let msg = factory.create_message();
        assert!(!msg.has_fault());
        assert!(msg.payload().is_none());
        let soap = msg.as_any().downcast_ref::<SoapMessage>().unwrap();
        assert_eq!(soap.version(), SoapVersion::Soap12);
    }
}
