//! Endpoint adapters: bridge opaque endpoint handles to an invocation call.

use std::sync::Arc;

use async_trait::async_trait;
use soapwire_core::MessageContext;

use super::endpoint::{DynEndpoint, MessageEndpoint, PayloadEndpoint};
use super::error::EndpointError;

// ---------------------------------------------------------------------------
// EndpointAdapter trait
// ---------------------------------------------------------------------------

/// Invokes endpoints of a shape it recognizes.
///
/// The dispatcher scans its ordered adapter list and uses the first adapter
/// whose `supports` returns true. `invoke` is only called on handles that
/// passed `supports`.
#[async_trait]
pub trait EndpointAdapter: Send + Sync {
    /// Whether this adapter can invoke the given endpoint handle.
    fn supports(&self, endpoint: &DynEndpoint) -> bool;

    /// Invoke the endpoint against the message context.
    ///
    /// # Errors
    ///
    /// Propagates the endpoint's error; the dispatcher offers it to the
    /// exception-resolver chain.
    async fn invoke(
        &self,
        ctx: &mut MessageContext,
        endpoint: &DynEndpoint,
    ) -> Result<(), EndpointError>;
}

fn unsupported_endpoint() -> EndpointError {
    EndpointError::Internal(anyhow::anyhow!(
        "adapter invoked with an endpoint handle it does not support"
    ))
}

// ---------------------------------------------------------------------------
// MessageEndpointAdapter
// ---------------------------------------------------------------------------

/// Adapter for handles wrapping an `Arc<dyn MessageEndpoint>`.
#[derive(Debug, Clone, Default)]
pub struct MessageEndpointAdapter;

#[async_trait]
impl EndpointAdapter for MessageEndpointAdapter {
    fn supports(&self, endpoint: &DynEndpoint) -> bool {
        endpoint.downcast_ref::<Arc<dyn MessageEndpoint>>().is_some()
    }

    async fn invoke(
        &self,
        ctx: &mut MessageContext,
        endpoint: &DynEndpoint,
    ) -> Result<(), EndpointError> {
        let endpoint = endpoint
            .downcast_ref::<Arc<dyn MessageEndpoint>>()
            .ok_or_else(unsupported_endpoint)?;
        endpoint.invoke(ctx).await
    }
}

// ---------------------------------------------------------------------------
// PayloadEndpointAdapter
// ---------------------------------------------------------------------------

/// Adapter for handles wrapping an `Arc<dyn PayloadEndpoint>`.
///
/// Feeds the endpoint the request payload and, when the endpoint produces a
/// response payload, writes it into the (lazily created) response message.
/// When the endpoint produces none, no response message is created.
#[derive(Debug, Clone, Default)]
pub struct PayloadEndpointAdapter;

#[async_trait]
impl EndpointAdapter for PayloadEndpointAdapter {
    fn supports(&self, endpoint: &DynEndpoint) -> bool {
        endpoint.downcast_ref::<Arc<dyn PayloadEndpoint>>().is_some()
    }

    async fn invoke(
        &self,
        ctx: &mut MessageContext,
        endpoint: &DynEndpoint,
    ) -> Result<(), EndpointError> {
        let endpoint = endpoint
            .downcast_ref::<Arc<dyn PayloadEndpoint>>()
            .ok_or_else(unsupported_endpoint)?;
        let request = ctx
            .request()
            .payload()
            .cloned()
            .ok_or_else(|| EndpointError::InvalidRequest("request has no payload".to_string()))?;
        if let Some(response) = endpoint.invoke(&request).await? {
            ctx.response_mut().set_payload(response);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use soapwire_core::{
        Payload, QName, SoapMessage, SoapMessageFactory, SoapVersion, WebServiceMessage,
    };

    use super::*;
    use crate::dispatch::endpoint;

    struct EchoPayloadEndpoint;

    #[async_trait]
    impl PayloadEndpoint for EchoPayloadEndpoint {
        async fn invoke(&self, request: &Payload) -> Result<Option<Payload>, EndpointError> {
            Ok(Some(Payload::new(
                QName::local("EchoResponse"),
                request.content.clone(),
            )))
        }
    }

    struct SilentPayloadEndpoint;

    #[async_trait]
    impl PayloadEndpoint for SilentPayloadEndpoint {
        async fn invoke(&self, _request: &Payload) -> Result<Option<Payload>, EndpointError> {
            Ok(None)
        }
    }

    struct ContextEndpoint;

    #[async_trait]
    impl MessageEndpoint for ContextEndpoint {
        async fn invoke(&self, ctx: &mut MessageContext) -> Result<(), EndpointError> {
            ctx.response_mut()
                .set_payload(Payload::new(QName::local("Reply"), "<Reply/>"));
            Ok(())
        }
    }

    fn make_ctx(payload: Option<Payload>) -> MessageContext {
        let mut request = SoapMessage::new(SoapVersion::Soap11);
        if let Some(payload) = payload {
            request.set_payload(payload);
        }
        MessageContext::new(
            Box::new(request),
            Arc::new(SoapMessageFactory::new(SoapVersion::Soap11)),
        )
    }

    #[test]
    fn adapters_support_only_their_endpoint_shape() {
        let message_handle = endpoint::message_endpoint(Arc::new(ContextEndpoint));
        let payload_handle = endpoint::payload_endpoint(Arc::new(EchoPayloadEndpoint));

        assert!(MessageEndpointAdapter.supports(&message_handle));
        assert!(!MessageEndpointAdapter.supports(&payload_handle));
        assert!(PayloadEndpointAdapter.supports(&payload_handle));
        assert!(!PayloadEndpointAdapter.supports(&message_handle));
    }

    #[tokio::test]
    async fn message_adapter_invokes_endpoint() {
        let handle = endpoint::message_endpoint(Arc::new(ContextEndpoint));
        let mut ctx = make_ctx(None);
        MessageEndpointAdapter.invoke(&mut ctx, &handle).await.unwrap();
        assert_eq!(
            ctx.response().unwrap().payload_root(),
            Some(&QName::local("Reply"))
        );
    }

    #[tokio::test]
    async fn payload_adapter_writes_response_payload() {
        let handle = endpoint::payload_endpoint(Arc::new(EchoPayloadEndpoint));
        let mut ctx = make_ctx(Some(Payload::new(QName::local("Echo"), "<Echo/>")));
        PayloadEndpointAdapter.invoke(&mut ctx, &handle).await.unwrap();
        assert_eq!(
            ctx.response().unwrap().payload_root(),
            Some(&QName::local("EchoResponse"))
        );
    }

    #[tokio::test]
    async fn payload_adapter_without_response_payload_creates_no_response() {
        let handle = endpoint::payload_endpoint(Arc::new(SilentPayloadEndpoint));
        let mut ctx = make_ctx(Some(Payload::new(QName::local("Echo"), "<Echo/>")));
        PayloadEndpointAdapter.invoke(&mut ctx, &handle).await.unwrap();
        assert!(!ctx.has_response());
    }

    #[tokio::test]
    async fn payload_adapter_rejects_missing_request_payload() {
        let handle = endpoint::payload_endpoint(Arc::new(EchoPayloadEndpoint));
        let mut ctx = make_ctx(None);
        let err = PayloadEndpointAdapter.invoke(&mut ctx, &handle).await.unwrap_err();
        assert!(matches!(err, EndpointError::InvalidRequest(_)));
    }
}
