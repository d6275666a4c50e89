//! Endpoint handles, endpoint traits, and the resolved invocation chain.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use soapwire_core::{MessageContext, Payload};

use super::error::EndpointError;
use super::interceptor::EndpointInterceptor;

// ---------------------------------------------------------------------------
// Endpoint handle
// ---------------------------------------------------------------------------

/// An opaque endpoint handle.
///
/// The dispatcher never looks inside; adapters probe the handle by downcast
/// and invoke it when they recognize the shape. The `Any` bound enables the
/// same type-based capability lookup used for adapter selection.
pub type DynEndpoint = Arc<dyn Any + Send + Sync>;

/// Wrap a message endpoint into an opaque handle recognized by
/// `MessageEndpointAdapter`.
#[must_use]
pub fn message_endpoint(endpoint: Arc<dyn MessageEndpoint>) -> DynEndpoint {
    Arc::new(endpoint)
}

/// Wrap a payload endpoint into an opaque handle recognized by
/// `PayloadEndpointAdapter`.
#[must_use]
pub fn payload_endpoint(endpoint: Arc<dyn PayloadEndpoint>) -> DynEndpoint {
    Arc::new(endpoint)
}

// ---------------------------------------------------------------------------
// Endpoint traits
// ---------------------------------------------------------------------------

/// An endpoint working against the full message context. The most general
/// endpoint shape: it reads the request and writes the response itself.
#[async_trait]
pub trait MessageEndpoint: Send + Sync {
    /// Handle the request in the given context.
    async fn invoke(&self, ctx: &mut MessageContext) -> Result<(), EndpointError>;
}

/// An endpoint working against body payloads only.
///
/// Returning `None` means no response: the adapter will not create a response
/// message, and the transport sends nothing back.
#[async_trait]
pub trait PayloadEndpoint: Send + Sync {
    /// Handle the request payload, optionally producing a response payload.
    async fn invoke(&self, request: &Payload) -> Result<Option<Payload>, EndpointError>;
}

// ---------------------------------------------------------------------------
// EndpointInvocationChain
// ---------------------------------------------------------------------------

/// A resolved endpoint paired with the ordered interceptors to apply around
/// its invocation, produced by an `EndpointMapping` and immutable afterwards.
///
/// SOAP metadata (the actor/role URIs the chain services and whether it acts
/// as the ultimate receiver) rides along as a capability extension consulted
/// only by the mustUnderstand pre-check.
#[derive(Clone)]
pub struct EndpointInvocationChain {
    endpoint: DynEndpoint,
    interceptors: Vec<Arc<dyn EndpointInterceptor>>,
    actors_or_roles: Vec<String>,
    ultimate_receiver: bool,
}

impl EndpointInvocationChain {
    /// Create a chain with no interceptors, acting as the ultimate receiver.
    #[must_use]
    pub fn new(endpoint: DynEndpoint) -> Self {
        Self {
            endpoint,
            interceptors: Vec::new(),
            actors_or_roles: Vec::new(),
            ultimate_receiver: true,
        }
    }

    /// Attach the ordered interceptor list.
    #[must_use]
    pub fn with_interceptors(mut self, interceptors: Vec<Arc<dyn EndpointInterceptor>>) -> Self {
        self.interceptors = interceptors;
        self
    }

    /// Attach the SOAP actor/role URIs this chain services.
    #[must_use]
    pub fn with_actors_or_roles(mut self, actors_or_roles: Vec<String>) -> Self {
        self.actors_or_roles = actors_or_roles;
        self
    }

    /// Set whether the chain acts as the SOAP 1.2 ultimate receiver.
    #[must_use]
    pub fn with_ultimate_receiver(mut self, ultimate_receiver: bool) -> Self {
        self.ultimate_receiver = ultimate_receiver;
        self
    }

    /// The opaque endpoint handle.
    #[must_use]
    pub fn endpoint(&self) -> &DynEndpoint {
        &self.endpoint
    }

    /// The ordered interceptor list, fixed at mapping-resolution time.
    #[must_use]
    pub fn interceptors(&self) -> &[Arc<dyn EndpointInterceptor>] {
        &self.interceptors
    }

    /// The SOAP actor/role URIs this chain services.
    #[must_use]
    pub fn actors_or_roles(&self) -> &[String] {
        &self.actors_or_roles
    }

    /// Whether the chain acts as the SOAP 1.2 ultimate receiver.
    #[must_use]
    pub fn is_ultimate_receiver(&self) -> bool {
        self.ultimate_receiver
    }
}
