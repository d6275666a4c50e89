//! Endpoint mappings: resolve an incoming message to an invocation chain.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use soapwire_core::{MessageContext, QName, SoapMessage};

use super::endpoint::{DynEndpoint, EndpointInvocationChain};
use super::error::EndpointError;
use super::interceptor::EndpointInterceptor;

// ---------------------------------------------------------------------------
// EndpointMapping trait
// ---------------------------------------------------------------------------

/// Maps an incoming message to an endpoint invocation chain.
///
/// The dispatcher consults its mappings strictly in configured order and
/// takes the first `Some` result. A mapping that does not match must return
/// `Ok(None)` without side effects on the context (it takes the context by
/// shared reference, so the compiler enforces this).
#[async_trait]
pub trait EndpointMapping: Send + Sync {
    /// Resolve the chain for this request, or `Ok(None)` when this mapping
    /// has no match.
    ///
    /// # Errors
    ///
    /// Returns an error when resolution itself fails (for example, a lookup
    /// against a broken registry); the dispatcher offers such errors to the
    /// exception-resolver chain.
    async fn endpoint(
        &self,
        ctx: &MessageContext,
    ) -> Result<Option<EndpointInvocationChain>, EndpointError>;
}

// ---------------------------------------------------------------------------
// Shared registration state
// ---------------------------------------------------------------------------

/// Keyed endpoint registrations plus the chain metadata every produced chain
/// carries: interceptors, an optional default endpoint, and SOAP actor/role
/// settings.
struct MapBasedRegistrations<K> {
    endpoints: HashMap<K, DynEndpoint>,
    default_endpoint: Option<DynEndpoint>,
    interceptors: Vec<Arc<dyn EndpointInterceptor>>,
    actors_or_roles: Vec<String>,
    ultimate_receiver: bool,
}

impl<K: std::hash::Hash + Eq> MapBasedRegistrations<K> {
    fn new() -> Self {
        Self {
            endpoints: HashMap::new(),
            default_endpoint: None,
            interceptors: Vec::new(),
            actors_or_roles: Vec::new(),
            ultimate_receiver: true,
        }
    }

    fn lookup(&self, key: Option<&K>) -> Option<&DynEndpoint> {
        key.and_then(|k| self.endpoints.get(k))
            .or(self.default_endpoint.as_ref())
    }

    fn chain_for(&self, endpoint: &DynEndpoint) -> EndpointInvocationChain {
        EndpointInvocationChain::new(endpoint.clone())
            .with_interceptors(self.interceptors.clone())
            .with_actors_or_roles(self.actors_or_roles.clone())
            .with_ultimate_receiver(self.ultimate_receiver)
    }
}

// ---------------------------------------------------------------------------
// PayloadRootMapping
// ---------------------------------------------------------------------------

/// Maps requests by the qualified name of the payload root element.
pub struct PayloadRootMapping {
    registrations: MapBasedRegistrations<QName>,
}

impl PayloadRootMapping {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registrations: MapBasedRegistrations::new(),
        }
    }

    /// Register an endpoint for the given payload root name.
    pub fn register(&mut self, name: QName, endpoint: DynEndpoint) {
        self.registrations.endpoints.insert(name, endpoint);
    }

    /// Set the endpoint used when no registration matches. Without a default,
    /// unmatched requests fall through to the next mapping.
    pub fn set_default_endpoint(&mut self, endpoint: DynEndpoint) {
        self.registrations.default_endpoint = Some(endpoint);
    }

    /// Set the interceptors attached to every chain this mapping produces.
    pub fn set_interceptors(&mut self, interceptors: Vec<Arc<dyn EndpointInterceptor>>) {
        self.registrations.interceptors = interceptors;
    }

    /// Set the SOAP actor/role URIs attached to produced chains.
    pub fn set_actors_or_roles(&mut self, actors_or_roles: Vec<String>) {
        self.registrations.actors_or_roles = actors_or_roles;
    }

    /// Set whether produced chains act as the SOAP 1.2 ultimate receiver.
    pub fn set_ultimate_receiver(&mut self, ultimate_receiver: bool) {
        self.registrations.ultimate_receiver = ultimate_receiver;
    }
}

impl Default for PayloadRootMapping {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EndpointMapping for PayloadRootMapping {
    async fn endpoint(
        &self,
        ctx: &MessageContext,
    ) -> Result<Option<EndpointInvocationChain>, EndpointError> {
        let root = ctx.request().payload_root();
        Ok(self
            .registrations
            .lookup(root)
            .map(|endpoint| self.registrations.chain_for(endpoint)))
    }
}

// ---------------------------------------------------------------------------
// SoapActionMapping
// ---------------------------------------------------------------------------

/// Maps requests by the SOAPAction transport value. Only SOAP messages can
/// match; other message types fall through.
///
/// SOAPAction arrives quoted on the wire (`"urn:action"`); values are
/// compared with surrounding quotes stripped, so registrations match either
/// form.
pub struct SoapActionMapping {
    registrations: MapBasedRegistrations<String>,
}

fn unquote(action: &str) -> &str {
    action
        .strip_prefix('"')
        .and_then(|a| a.strip_suffix('"'))
        .unwrap_or(action)
}

impl SoapActionMapping {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registrations: MapBasedRegistrations::new(),
        }
    }

    /// Register an endpoint for the given SOAPAction value.
    pub fn register(&mut self, action: impl Into<String>, endpoint: DynEndpoint) {
        let action = action.into();
        self.registrations
            .endpoints
            .insert(unquote(&action).to_string(), endpoint);
    }

    /// Set the endpoint used when no registration matches.
    pub fn set_default_endpoint(&mut self, endpoint: DynEndpoint) {
        self.registrations.default_endpoint = Some(endpoint);
    }

    /// Set the interceptors attached to every chain this mapping produces.
    pub fn set_interceptors(&mut self, interceptors: Vec<Arc<dyn EndpointInterceptor>>) {
        self.registrations.interceptors = interceptors;
    }

    /// Set the SOAP actor/role URIs attached to produced chains.
    pub fn set_actors_or_roles(&mut self, actors_or_roles: Vec<String>) {
        self.registrations.actors_or_roles = actors_or_roles;
    }
}

impl Default for SoapActionMapping {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EndpointMapping for SoapActionMapping {
    async fn endpoint(
        &self,
        ctx: &MessageContext,
    ) -> Result<Option<EndpointInvocationChain>, EndpointError> {
        let action = ctx
            .request()
            .as_any()
            .downcast_ref::<SoapMessage>()
            .and_then(|soap| soap.soap_action())
            .map(|action| unquote(action).to_owned());
        Ok(self
            .registrations
            .lookup(action.as_ref())
            .map(|endpoint| self.registrations.chain_for(endpoint)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use soapwire_core::{Payload, SoapMessageFactory, SoapVersion, WebServiceMessage};

    use super::*;

    fn make_ctx(request: SoapMessage) -> MessageContext {
        MessageContext::new(
            Box::new(request),
            Arc::new(SoapMessageFactory::new(SoapVersion::Soap11)),
        )
    }

    fn make_endpoint() -> DynEndpoint {
        Arc::new("endpoint")
    }

    #[tokio::test]
    async fn payload_root_match_produces_chain() {
        let mut mapping = PayloadRootMapping::new();
        let endpoint = make_endpoint();
        mapping.register(QName::new("urn:air", "GetFlights"), endpoint.clone());

        let mut request = SoapMessage::new(SoapVersion::Soap11);
        request.set_payload(Payload::new(QName::new("urn:air", "GetFlights"), "<q/>"));
        let ctx = make_ctx(request);

        let chain = mapping.endpoint(&ctx).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(chain.endpoint(), &endpoint));
    }

    #[tokio::test]
    async fn payload_root_no_match_returns_none() {
        let mut mapping = PayloadRootMapping::new();
        mapping.register(QName::new("urn:air", "GetFlights"), make_endpoint());

        let mut request = SoapMessage::new(SoapVersion::Soap11);
        request.set_payload(Payload::new(QName::new("urn:air", "BookFlight"), "<q/>"));
        let ctx = make_ctx(request);

        assert!(mapping.endpoint(&ctx).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn default_endpoint_catches_unmatched_requests() {
        let mut mapping = PayloadRootMapping::new();
        let fallback = make_endpoint();
        mapping.set_default_endpoint(fallback.clone());

        let ctx = make_ctx(SoapMessage::new(SoapVersion::Soap11));
        let chain = mapping.endpoint(&ctx).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(chain.endpoint(), &fallback));
    }

    #[tokio::test]
    async fn chains_carry_mapping_interceptors_and_roles() {
        let mut mapping = PayloadRootMapping::new();
        mapping.register(QName::local("Echo"), make_endpoint());
        mapping.set_interceptors(vec![Arc::new(
            crate::dispatch::interceptor::PayloadLoggingInterceptor,
        )]);
        mapping.set_actors_or_roles(vec!["urn:gateway".to_string()]);
        mapping.set_ultimate_receiver(false);

        let mut request = SoapMessage::new(SoapVersion::Soap11);
        request.set_payload(Payload::new(QName::local("Echo"), "<Echo/>"));
        let ctx = make_ctx(request);

        let chain = mapping.endpoint(&ctx).await.unwrap().unwrap();
        assert_eq!(chain.interceptors().len(), 1);
        assert_eq!(chain.actors_or_roles(), ["urn:gateway".to_string()]);
        assert!(!chain.is_ultimate_receiver());
    }

    #[tokio::test]
    async fn soap_action_match_produces_chain() {
        let mut mapping = SoapActionMapping::new();
        let endpoint = make_endpoint();
        mapping.register("urn:air#GetFlights", endpoint.clone());

        let mut request = SoapMessage::new(SoapVersion::Soap11);
        request.set_soap_action("urn:air#GetFlights");
        let ctx = make_ctx(request);

        let chain = mapping.endpoint(&ctx).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(chain.endpoint(), &endpoint));
    }

    #[tokio::test]
    async fn soap_action_quotes_are_stripped_on_both_sides() {
        let mut mapping = SoapActionMapping::new();
        let endpoint = make_endpoint();
        mapping.register("\"urn:air#GetFlights\"", endpoint.clone());

        // The wire form carries quotes; the registration above does too, and
        // both are normalized before lookup.
        let mut request = SoapMessage::new(SoapVersion::Soap11);
        request.set_soap_action("\"urn:air#GetFlights\"");
        let chain = mapping.endpoint(&make_ctx(request)).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(chain.endpoint(), &endpoint));

        let mut request = SoapMessage::new(SoapVersion::Soap11);
        request.set_soap_action("urn:air#GetFlights");
        let chain = mapping.endpoint(&make_ctx(request)).await.unwrap().unwrap();
        assert!(Arc::ptr_eq(chain.endpoint(), &endpoint));
    }

    #[tokio::test]
    async fn soap_action_absent_returns_none() {
        let mut mapping = SoapActionMapping::new();
        mapping.register("urn:air#GetFlights", make_endpoint());

        let ctx = make_ctx(SoapMessage::new(SoapVersion::Soap11));
        assert!(mapping.endpoint(&ctx).await.unwrap().is_none());
    }
}
