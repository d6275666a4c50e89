//! Exception resolvers: convert endpoint errors into SOAP fault responses.

use std::sync::Arc;

use async_trait::async_trait;
use soapwire_core::{FaultCode, MessageContext, SoapMessage};

use super::endpoint::DynEndpoint;
use super::error::{EndpointError, ErrorClass};

// ---------------------------------------------------------------------------
// EndpointExceptionResolver trait
// ---------------------------------------------------------------------------

/// Converts an endpoint error into a fault response, or declines.
///
/// The dispatcher runs its resolvers in configured order; the first one to
/// return `true` has handled the error (typically by writing a fault into
/// the context's response) and no further resolvers are consulted.
#[async_trait]
pub trait EndpointExceptionResolver: Send + Sync {
    /// Try to resolve the error. `endpoint` is the executing endpoint, or
    /// `None` when the error was raised before one was chosen.
    async fn resolve_exception(
        &self,
        ctx: &mut MessageContext,
        endpoint: Option<&DynEndpoint>,
        error: &EndpointError,
    ) -> bool;
}

// ---------------------------------------------------------------------------
// FaultDefinition
// ---------------------------------------------------------------------------

/// Describes the fault a resolver writes for a matched error.
#[derive(Debug, Clone)]
pub struct FaultDefinition {
    code: FaultCode,
    fault_string: Option<String>,
    lang: String,
    detail: Option<serde_json::Value>,
}

impl FaultDefinition {
    /// A definition with the given code; the fault string defaults to the
    /// error's display form.
    #[must_use]
    pub fn new(code: FaultCode) -> Self {
        Self {
            code,
            fault_string: None,
            lang: "en".to_string(),
            detail: None,
        }
    }

    /// A sender fault with a fixed fault string.
    #[must_use]
    pub fn sender(fault_string: impl Into<String>) -> Self {
        Self::new(FaultCode::Sender).with_fault_string(fault_string)
    }

    /// A receiver fault with a fixed fault string.
    #[must_use]
    pub fn receiver(fault_string: impl Into<String>) -> Self {
        Self::new(FaultCode::Receiver).with_fault_string(fault_string)
    }

    /// Use a fixed fault string instead of the error's display form.
    #[must_use]
    pub fn with_fault_string(mut self, fault_string: impl Into<String>) -> Self {
        self.fault_string = Some(fault_string.into());
        self
    }

    /// Language of the fault reason text.
    #[must_use]
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }

    /// Attach structured detail content to written faults.
    #[must_use]
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Write this definition into the context's response as a fault.
    /// Returns false when the response message is not a SOAP message.
    fn write(&self, ctx: &mut MessageContext, error: &EndpointError) -> bool {
        let Some(response) = ctx.response_mut().as_any_mut().downcast_mut::<SoapMessage>() else {
            tracing::warn!("cannot write fault: response message is not a SOAP message");
            return false;
        };
        let fault_string = self
            .fault_string
            .clone()
            .unwrap_or_else(|| error.to_string());
        let fault = response.body_mut().add_fault(self.code.clone(), fault_string);
        fault.set_lang(self.lang.clone());
        if let Some(detail) = &self.detail {
            fault.set_detail(detail.clone());
        }
        true
    }
}

// ---------------------------------------------------------------------------
// SimpleSoapExceptionResolver
// ---------------------------------------------------------------------------

/// Unconditional catch-all resolver: writes a receiver fault carrying the
/// error's display form. Intended as the last resolver in a chain, and the
/// built-in default when no resolvers are configured.
#[derive(Debug, Clone, Default)]
pub struct SimpleSoapExceptionResolver;

#[async_trait]
impl EndpointExceptionResolver for SimpleSoapExceptionResolver {
    async fn resolve_exception(
        &self,
        ctx: &mut MessageContext,
        _endpoint: Option<&DynEndpoint>,
        error: &EndpointError,
    ) -> bool {
        FaultDefinition::new(FaultCode::Receiver).write(ctx, error)
    }
}

// ---------------------------------------------------------------------------
// FaultMappingExceptionResolver
// ---------------------------------------------------------------------------

/// Resolver that maps error classes to fault definitions by ranked match.
///
/// Each mapping pairs an `ErrorClass` with a `FaultDefinition`. For a given
/// error, the mapping with the smallest matching depth wins (exact kind
/// beats side, side beats catch-all); among equal depths the earliest
/// registration wins. When nothing matches, the optional default fault is
/// used; without one the resolver declines.
pub struct FaultMappingExceptionResolver {
    mappings: Vec<(ErrorClass, FaultDefinition)>,
    default_fault: Option<FaultDefinition>,
    mapped_endpoints: Option<Vec<DynEndpoint>>,
}

impl FaultMappingExceptionResolver {
    /// Create a resolver with no mappings and no default fault.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mappings: Vec::new(),
            default_fault: None,
            mapped_endpoints: None,
        }
    }

    /// Append a mapping. Registration order breaks depth ties.
    pub fn add_mapping(&mut self, class: ErrorClass, definition: FaultDefinition) {
        self.mappings.push((class, definition));
    }

    /// Set the fault used when no mapping matches. With a default fault set,
    /// this resolver never declines (for gated endpoints, see
    /// `set_mapped_endpoints`).
    pub fn set_default_fault(&mut self, definition: FaultDefinition) {
        self.default_fault = Some(definition);
    }

    /// Restrict this resolver to the given endpoints (pointer identity).
    /// Errors from other endpoints are declined outright.
    pub fn set_mapped_endpoints(&mut self, endpoints: Vec<DynEndpoint>) {
        self.mapped_endpoints = Some(endpoints);
    }

    fn fault_definition(&self, error: &EndpointError) -> Option<&FaultDefinition> {
        let kind = error.kind();
        let mut best: Option<(u32, &FaultDefinition)> = None;
        for (class, definition) in &self.mappings {
            if let Some(depth) = class.depth(kind) {
                // Strict inequality keeps the earliest registration on ties.
                if best.map_or(true, |(d, _)| depth < d) {
                    best = Some((depth, definition));
                }
            }
        }
        best.map(|(_, definition)| definition)
            .or(self.default_fault.as_ref())
    }
}

impl Default for FaultMappingExceptionResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EndpointExceptionResolver for FaultMappingExceptionResolver {
    async fn resolve_exception(
        &self,
        ctx: &mut MessageContext,
        endpoint: Option<&DynEndpoint>,
        error: &EndpointError,
    ) -> bool {
        if let Some(mapped) = &self.mapped_endpoints {
            let applies = endpoint
                .is_some_and(|e| mapped.iter().any(|candidate| Arc::ptr_eq(candidate, e)));
            if !applies {
                return false;
            }
        }
        let Some(definition) = self.fault_definition(error) else {
            return false;
        };
        definition.write(ctx, error)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use soapwire_core::{QName, SoapMessageFactory, SoapVersion};

    use super::*;
    use crate::dispatch::error::ErrorKind;

    fn make_ctx(version: SoapVersion) -> MessageContext {
        MessageContext::new(
            Box::new(SoapMessage::new(version)),
            Arc::new(SoapMessageFactory::new(version)),
        )
    }

    fn response_fault_code(ctx: &MessageContext) -> FaultCode {
        ctx.response()
            .unwrap()
            .as_any()
            .downcast_ref::<SoapMessage>()
            .unwrap()
            .body()
            .fault()
            .unwrap()
            .code()
            .clone()
    }

    #[tokio::test]
    async fn simple_resolver_writes_receiver_fault() {
        let mut ctx = make_ctx(SoapVersion::Soap11);
        let error = EndpointError::Processing("boom".to_string());
        assert!(
            SimpleSoapExceptionResolver
                .resolve_exception(&mut ctx, None, &error)
                .await
        );
        assert!(ctx.response().unwrap().has_fault());
        assert_eq!(response_fault_code(&ctx), FaultCode::Receiver);
    }

    #[tokio::test]
    async fn exact_kind_beats_coarser_classes_regardless_of_order() {
        let mut resolver = FaultMappingExceptionResolver::new();
        resolver.add_mapping(ErrorClass::Any, FaultDefinition::receiver("any"));
        resolver.add_mapping(ErrorClass::Client, FaultDefinition::sender("client"));
        resolver.add_mapping(
            ErrorClass::Kind(ErrorKind::InvalidRequest),
            FaultDefinition::sender("exact"),
        );

        let mut ctx = make_ctx(SoapVersion::Soap11);
        let error = EndpointError::InvalidRequest("bad".to_string());
        assert!(resolver.resolve_exception(&mut ctx, None, &error).await);

        let response = ctx
            .response()
            .unwrap()
            .as_any()
            .downcast_ref::<SoapMessage>()
            .unwrap();
        assert_eq!(response.body().fault().unwrap().fault_string(), "exact");
    }

    #[tokio::test]
    async fn equal_depth_ties_go_to_earliest_registration() {
        let mut resolver = FaultMappingExceptionResolver::new();
        resolver.add_mapping(ErrorClass::Server, FaultDefinition::receiver("first"));
        resolver.add_mapping(ErrorClass::Server, FaultDefinition::receiver("second"));

        let mut ctx = make_ctx(SoapVersion::Soap11);
        let error = EndpointError::Processing("boom".to_string());
        assert!(resolver.resolve_exception(&mut ctx, None, &error).await);

        let response = ctx
            .response()
            .unwrap()
            .as_any()
            .downcast_ref::<SoapMessage>()
            .unwrap();
        assert_eq!(response.body().fault().unwrap().fault_string(), "first");
    }

    #[tokio::test]
    async fn unmatched_error_without_default_declines() {
        let mut resolver = FaultMappingExceptionResolver::new();
        resolver.add_mapping(
            ErrorClass::Kind(ErrorKind::Unauthorized),
            FaultDefinition::sender("denied"),
        );

        let mut ctx = make_ctx(SoapVersion::Soap11);
        let error = EndpointError::Processing("boom".to_string());
        assert!(!resolver.resolve_exception(&mut ctx, None, &error).await);
        assert!(!ctx.has_response());
    }

    #[tokio::test]
    async fn default_fault_catches_unmatched_errors() {
        let mut resolver = FaultMappingExceptionResolver::new();
        resolver.set_default_fault(FaultDefinition::receiver("fallback"));

        let mut ctx = make_ctx(SoapVersion::Soap11);
        let error = EndpointError::Processing("boom".to_string());
        assert!(resolver.resolve_exception(&mut ctx, None, &error).await);
        assert_eq!(response_fault_code(&ctx), FaultCode::Receiver);
    }

    #[tokio::test]
    async fn mapped_endpoints_gate_resolution() {
        let ours: DynEndpoint = Arc::new("ours");
        let theirs: DynEndpoint = Arc::new("theirs");

        let mut resolver = FaultMappingExceptionResolver::new();
        resolver.set_default_fault(FaultDefinition::receiver("fallback"));
        resolver.set_mapped_endpoints(vec![ours.clone()]);

        let error = EndpointError::Processing("boom".to_string());

        let mut ctx = make_ctx(SoapVersion::Soap11);
        assert!(
            !resolver
                .resolve_exception(&mut ctx, Some(&theirs), &error)
                .await
        );
        assert!(
            resolver
                .resolve_exception(&mut ctx, Some(&ours), &error)
                .await
        );
    }

    #[tokio::test]
    async fn fault_definition_attaches_detail_and_lang() {
        let mut resolver = FaultMappingExceptionResolver::new();
        resolver.add_mapping(
            ErrorClass::Any,
            FaultDefinition::new(FaultCode::Custom(QName::new("urn:faults", "Backend")))
                .with_lang("fr")
                .with_detail(serde_json::json!({"retryable": false})),
        );

        let mut ctx = make_ctx(SoapVersion::Soap12);
        let error = EndpointError::Processing("boom".to_string());
        assert!(resolver.resolve_exception(&mut ctx, None, &error).await);

        let response = ctx
            .response()
            .unwrap()
            .as_any()
            .downcast_ref::<SoapMessage>()
            .unwrap();
        let fault = response.body().fault().unwrap();
        assert_eq!(fault.lang(), "fr");
        assert_eq!(fault.detail(), Some(&serde_json::json!({"retryable": false})));
        // Error display is used when no fixed fault string is configured.
        assert_eq!(fault.fault_string(), "endpoint processing failed: boom");
    }
}
