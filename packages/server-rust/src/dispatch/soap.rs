//! SOAP-specific dispatch behavior: the mustUnderstand pre-check.

use std::sync::Arc;

use async_trait::async_trait;
use soapwire_core::{MessageContext, QName, SoapMessage, SoapVersion};

use super::config::DispatcherConfig;
use super::dispatcher::{DispatcherBuilder, MessageDispatcher, RequestPrecheck};
use super::endpoint::EndpointInvocationChain;
use super::error::EndpointError;

// ---------------------------------------------------------------------------
// MustUnderstandChecker
// ---------------------------------------------------------------------------

/// Pre-check enforcing SOAP mustUnderstand semantics.
///
/// Before the interceptor chain runs, every header block targeted at this
/// node and marked mustUnderstand must be claimed by at least one SOAP-aware
/// interceptor in the resolved chain. When any block goes unclaimed, a
/// mustUnderstand fault is written and the dispatch stops without invoking
/// the endpoint. Non-SOAP requests pass through untouched.
pub struct MustUnderstandChecker {
    fault_string: String,
    lang: String,
}

impl MustUnderstandChecker {
    /// Create a checker with the configured fault text.
    #[must_use]
    pub fn new(config: &DispatcherConfig) -> Self {
        Self {
            fault_string: config.must_understand_fault_string.clone(),
            lang: config.fault_string_lang.clone(),
        }
    }

    fn write_fault(
        &self,
        ctx: &mut MessageContext,
        chain: &EndpointInvocationChain,
        version: SoapVersion,
        not_understood: &[QName],
    ) -> Result<(), EndpointError> {
        let Some(response) = ctx
            .response_mut()
            .as_any_mut()
            .downcast_mut::<SoapMessage>()
        else {
            return Err(EndpointError::Internal(anyhow::anyhow!(
                "mustUnderstand violation on a non-SOAP response message"
            )));
        };
        let fault = response
            .body_mut()
            .add_must_understand_fault(self.fault_string.clone(), self.lang.clone());
        if let Some(role) = chain.actors_or_roles().first() {
            fault.set_role(role.clone());
        }
        if version == SoapVersion::Soap12 {
            for name in not_understood {
                response.header_mut().add_not_understood(name.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RequestPrecheck for MustUnderstandChecker {
    async fn handle_request(
        &self,
        chain: &EndpointInvocationChain,
        ctx: &mut MessageContext,
    ) -> Result<bool, EndpointError> {
        let Some(request) = ctx.request().as_any().downcast_ref::<SoapMessage>() else {
            return Ok(true);
        };
        let version = request.version();
        let not_understood: Vec<QName> = request
            .header()
            .elements_to_process(version, chain.actors_or_roles(), chain.is_ultimate_receiver())
            .into_iter()
            .filter(|element| element.must_understand())
            .filter(|element| {
                !chain
                    .interceptors()
                    .iter()
                    .any(|i| i.as_soap().is_some_and(|soap| soap.understands(element)))
            })
            .map(|element| element.name().clone())
            .collect();

        if not_understood.is_empty() {
            return Ok(true);
        }

        tracing::warn!(
            headers = ?not_understood,
            "mandatory header blocks not understood"
        );
        self.write_fault(ctx, chain, version, &not_understood)?;
        Ok(false)
    }
}

impl MessageDispatcher {
    /// Builder pre-loaded with the mustUnderstand pre-check, for dispatchers
    /// serving SOAP transports.
    #[must_use]
    pub fn soap_builder(config: &DispatcherConfig) -> DispatcherBuilder {
        Self::builder().precheck(Arc::new(MustUnderstandChecker::new(config)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
