//! Interceptor hooks applied around endpoint invocation.

use async_trait::async_trait;
use soapwire_core::{MessageContext, SoapHeaderElement};

use super::endpoint::DynEndpoint;
use super::error::EndpointError;

// ---------------------------------------------------------------------------
// EndpointInterceptor
// ---------------------------------------------------------------------------

/// Cross-cutting hooks around one endpoint invocation.
///
/// `handle_request` runs in chain order before the endpoint; returning
/// `Ok(false)` stops the chain and skips the endpoint. `handle_response` and
/// `handle_fault` run in reverse order afterwards, starting at the last
/// interceptor whose `handle_request` was invoked — an interceptor that never
/// saw the request never sees the response. Which of the two is called
/// depends on whether the current response carries a fault.
///
/// Interceptors hold no per-request state; all three hooks default to
/// pass-through.
#[async_trait]
pub trait EndpointInterceptor: Send + Sync {
    /// Called before the endpoint is invoked. Return `Ok(false)` to stop the
    /// chain; the response, if any, is then processed by the interceptors
    /// already invoked.
    async fn handle_request(
        &self,
        _ctx: &mut MessageContext,
        _endpoint: &DynEndpoint,
    ) -> Result<bool, EndpointError> {
        Ok(true)
    }

    /// Called after invocation when the response carries no fault. Return
    /// `Ok(false)` to stop the reverse walk.
    async fn handle_response(
        &self,
        _ctx: &mut MessageContext,
        _endpoint: &DynEndpoint,
    ) -> Result<bool, EndpointError> {
        Ok(true)
    }

    /// Called after invocation when the response carries a fault. Return
    /// `Ok(false)` to stop the reverse walk.
    async fn handle_fault(
        &self,
        _ctx: &mut MessageContext,
        _endpoint: &DynEndpoint,
    ) -> Result<bool, EndpointError> {
        Ok(true)
    }

    /// Capability probe for the SOAP extension. The mustUnderstand pre-check
    /// uses this to find interceptors that can claim header blocks; the
    /// generic pre/post phases never call it.
    fn as_soap(&self) -> Option<&dyn SoapEndpointInterceptor> {
        None
    }
}

/// SOAP-aware interceptor that can claim mustUnderstand header blocks.
pub trait SoapEndpointInterceptor: EndpointInterceptor {
    /// Whether this interceptor understands (and will process) the given
    /// header block.
    fn understands(&self, header: &SoapHeaderElement) -> bool;
}

// ---------------------------------------------------------------------------
// PayloadLoggingInterceptor
// ---------------------------------------------------------------------------

/// Logs the payload root of request and response at debug level. Never stops
/// the chain.
#[derive(Debug, Clone, Default)]
pub struct PayloadLoggingInterceptor;

#[async_trait]
impl EndpointInterceptor for PayloadLoggingInterceptor {
    async fn handle_request(
        &self,
        ctx: &mut MessageContext,
        _endpoint: &DynEndpoint,
    ) -> Result<bool, EndpointError> {
        tracing::debug!(
            payload = ?ctx.request().payload_root(),
            "request payload"
        );
        Ok(true)
    }

    async fn handle_response(
        &self,
        ctx: &mut MessageContext,
        _endpoint: &DynEndpoint,
    ) -> Result<bool, EndpointError> {
        tracing::debug!(
            payload = ?ctx.response().and_then(|r| r.payload_root()),
            "response payload"
        );
        Ok(true)
    }

    async fn handle_fault(
        &self,
        _ctx: &mut MessageContext,
        _endpoint: &DynEndpoint,
    ) -> Result<bool, EndpointError> {
        tracing::debug!("response carries fault");
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use soapwire_core::{
        Payload, QName, SoapMessage, SoapMessageFactory, SoapVersion, WebServiceMessage,
    };

    use super::*;

    fn make_ctx() -> MessageContext {
        let mut request = SoapMessage::new(SoapVersion::Soap11);
        request.set_payload(Payload::new(QName::local("Echo"), "<Echo/>"));
        MessageContext::new(
            Box::new(request),
            Arc::new(SoapMessageFactory::new(SoapVersion::Soap11)),
        )
    }

    #[tokio::test]
    async fn default_hooks_pass_through() {
        struct Noop;
        impl EndpointInterceptor for Noop {}

        let interceptor = Noop;
        let endpoint: DynEndpoint = Arc::new(());
        let mut ctx = make_ctx();
        assert!(interceptor.handle_request(&mut ctx, &endpoint).await.unwrap());
        assert!(interceptor.handle_response(&mut ctx, &endpoint).await.unwrap());
        assert!(interceptor.handle_fault(&mut ctx, &endpoint).await.unwrap());
        assert!(interceptor.as_soap().is_none());
    }

    #[tokio::test]
    async fn logging_interceptor_continues_chain() {
        let interceptor = PayloadLoggingInterceptor;
        let endpoint: DynEndpoint = Arc::new(());
        let mut ctx = make_ctx();
        assert!(interceptor.handle_request(&mut ctx, &endpoint).await.unwrap());
        assert!(interceptor.handle_response(&mut ctx, &endpoint).await.unwrap());
    }
}
