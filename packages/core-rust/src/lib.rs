//! `SoapWire` Core — qualified names, SOAP envelope model, and message context.

pub mod context;
pub mod message;
pub mod qname;
pub mod soap;

pub use context::MessageContext;
pub use message::{Payload, WebServiceMessage, WebServiceMessageFactory};
pub use qname::QName;
pub use soap::{
    FaultCode, SoapBody, SoapFault, SoapHeader, SoapHeaderElement, SoapMessage, SoapMessageFactory,
    SoapVersion,
};
