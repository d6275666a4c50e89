//! The message dispatcher: mapping resolution, interceptor phases, adapter
//! invocation, and error resolution for one request at a time.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use soapwire_core::MessageContext;

use super::adapter::{EndpointAdapter, MessageEndpointAdapter, PayloadEndpointAdapter};
use super::endpoint::EndpointInvocationChain;
use super::error::{DispatchError, EndpointError};
use super::mapping::EndpointMapping;
use super::resolver::{EndpointExceptionResolver, SimpleSoapExceptionResolver};

// ---------------------------------------------------------------------------
// MessageReceiver / RequestPrecheck
// ---------------------------------------------------------------------------

/// Entry point a transport hands fully parsed messages to.
#[async_trait]
pub trait MessageReceiver: Send + Sync {
    /// Process one request context to completion.
    ///
    /// # Errors
    ///
    /// Returns a `DispatchError` describing why the request could not be
    /// handled; the transport decides how to report it.
    async fn receive(&self, ctx: &mut MessageContext) -> Result<(), DispatchError>;
}

/// Hook that runs after mapping resolution and before the interceptor chain.
///
/// Returning `Ok(false)` stops the dispatch silently: no interceptors run,
/// the endpoint is not invoked, and whatever response the hook wrote (for
/// example a mustUnderstand fault) is sent as-is.
#[async_trait]
pub trait RequestPrecheck: Send + Sync {
    /// Inspect the request against the resolved chain.
    ///
    /// # Errors
    ///
    /// Errors are offered to the exception-resolver chain like endpoint
    /// errors.
    async fn handle_request(
        &self,
        chain: &EndpointInvocationChain,
        ctx: &mut MessageContext,
    ) -> Result<bool, EndpointError>;
}

// ---------------------------------------------------------------------------
// MessageDispatcher
// ---------------------------------------------------------------------------

/// Central dispatch pipeline.
///
/// For each request: consult the mappings in order and take the first match,
/// run the optional pre-check, run the chain's interceptors forward, invoke
/// the endpoint through the first supporting adapter, then walk the invoked
/// interceptors backward over the response. Endpoint errors are offered to
/// the exception resolvers before the backward walk runs.
///
/// The dispatcher holds no per-request state and serves concurrent requests
/// from behind an `Arc`.
pub struct MessageDispatcher {
    mappings: Vec<Arc<dyn EndpointMapping>>,
    adapters: Vec<Arc<dyn EndpointAdapter>>,
    resolvers: Vec<Arc<dyn EndpointExceptionResolver>>,
    precheck: Option<Arc<dyn RequestPrecheck>>,
}

/// Internal dispatch failure, mapped to `DispatchError` at the top level.
enum Failure {
    NoEndpoint,
    NoAdapter,
    Endpoint {
        error: EndpointError,
        post_phase_ran: bool,
    },
}

impl Failure {
    fn before_post(error: EndpointError) -> Self {
        Self::Endpoint {
            error,
            post_phase_ran: false,
        }
    }

    fn during_post(error: EndpointError) -> Self {
        Self::Endpoint {
            error,
            post_phase_ran: true,
        }
    }
}

impl MessageDispatcher {
    /// Start building a dispatcher.
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Dispatch one request context.
    ///
    /// # Errors
    ///
    /// - `NoEndpointFound` when no mapping matches; nothing else runs.
    /// - `NoAdapterFound` when the resolved endpoint has no supporting
    ///   adapter; resolvers are not consulted for this configuration defect.
    /// - `Unresolved` when an endpoint error was declined by every resolver.
    pub async fn dispatch(&self, ctx: &mut MessageContext) -> Result<(), DispatchError> {
        let mut chain: Option<EndpointInvocationChain> = None;
        let mut interceptor_index: Option<usize> = None;

        match self
            .dispatch_inner(ctx, &mut chain, &mut interceptor_index)
            .await
        {
            Ok(()) => Ok(()),
            Err(Failure::NoEndpoint) => {
                tracing::warn!("no endpoint mapping matched the request");
                Err(DispatchError::NoEndpointFound)
            }
            Err(Failure::NoAdapter) => {
                // Interceptors that saw the request still see the response,
                // but resolvers have nothing to offer for a missing adapter.
                self.run_post_phase(chain.as_ref(), interceptor_index, ctx)
                    .await;
                Err(DispatchError::NoAdapterFound)
            }
            Err(Failure::Endpoint {
                error,
                post_phase_ran,
            }) => {
                let resolved = self
                    .process_endpoint_error(ctx, chain.as_ref(), &error)
                    .await;
                if !post_phase_ran {
                    self.run_post_phase(chain.as_ref(), interceptor_index, ctx)
                        .await;
                }
                if resolved {
                    Ok(())
                } else {
                    Err(DispatchError::Unresolved(error))
                }
            }
        }
    }

    async fn dispatch_inner(
        &self,
        ctx: &mut MessageContext,
        chain_slot: &mut Option<EndpointInvocationChain>,
        index_slot: &mut Option<usize>,
    ) -> Result<(), Failure> {
        let Some(chain) = self
            .resolve_endpoint(ctx)
            .await
            .map_err(Failure::before_post)?
        else {
            return Err(Failure::NoEndpoint);
        };
        *chain_slot = Some(chain.clone());

        if let Some(precheck) = &self.precheck {
            let proceed = precheck
                .handle_request(&chain, ctx)
                .await
                .map_err(Failure::before_post)?;
            if !proceed {
                tracing::debug!("request pre-check stopped dispatch");
                return Ok(());
            }
        }

        let endpoint = chain.endpoint().clone();
        for (i, interceptor) in chain.interceptors().iter().enumerate() {
            *index_slot = Some(i);
            let proceed = interceptor
                .handle_request(ctx, &endpoint)
                .await
                .map_err(Failure::before_post)?;
            if !proceed {
                tracing::debug!(index = i, "interceptor stopped the request phase");
                return self
                    .trigger_handle_response(Some(&chain), *index_slot, ctx)
                    .await
                    .map_err(Failure::during_post);
            }
        }

        let adapter = self.endpoint_adapter(&chain).ok_or(Failure::NoAdapter)?;
        adapter
            .invoke(ctx, &endpoint)
            .await
            .map_err(Failure::before_post)?;

        self.trigger_handle_response(Some(&chain), *index_slot, ctx)
            .await
            .map_err(Failure::during_post)
    }

    /// Consult the mappings in configured order; the first match wins and
    /// later mappings are not called.
    async fn resolve_endpoint(
        &self,
        ctx: &MessageContext,
    ) -> Result<Option<EndpointInvocationChain>, EndpointError> {
        for mapping in &self.mappings {
            if let Some(chain) = mapping.endpoint(ctx).await? {
                tracing::debug!("endpoint mapping matched the request");
                return Ok(Some(chain));
            }
        }
        Ok(None)
    }

    /// First adapter whose `supports` accepts the chain's endpoint handle.
    fn endpoint_adapter(&self, chain: &EndpointInvocationChain) -> Option<&Arc<dyn EndpointAdapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.supports(chain.endpoint()))
    }

    /// Offer the error to the resolvers in configured order; the first one
    /// to claim it wins.
    async fn process_endpoint_error(
        &self,
        ctx: &mut MessageContext,
        chain: Option<&EndpointInvocationChain>,
        error: &EndpointError,
    ) -> bool {
        let endpoint = chain.map(EndpointInvocationChain::endpoint);
        for resolver in &self.resolvers {
            if resolver.resolve_exception(ctx, endpoint, error).await {
                tracing::debug!(%error, "endpoint error resolved to a fault");
                return true;
            }
        }
        false
    }

    /// Walk the invoked interceptors in reverse over the response, choosing
    /// `handle_fault` or `handle_response` per step by whether the response
    /// currently carries a fault. No-op when no interceptor was invoked or no
    /// response exists.
    async fn trigger_handle_response(
        &self,
        chain: Option<&EndpointInvocationChain>,
        index: Option<usize>,
        ctx: &mut MessageContext,
    ) -> Result<(), EndpointError> {
        let (Some(chain), Some(index)) = (chain, index) else {
            return Ok(());
        };
        if !ctx.has_response() || chain.interceptors().is_empty() {
            return Ok(());
        }
        let endpoint = chain.endpoint().clone();
        for i in (0..=index).rev() {
            let interceptor = &chain.interceptors()[i];
            let has_fault = ctx.response().is_some_and(|r| r.has_fault());
            let proceed = if has_fault {
                interceptor.handle_fault(ctx, &endpoint).await?
            } else {
                interceptor.handle_response(ctx, &endpoint).await?
            };
            if !proceed {
                break;
            }
        }
        Ok(())
    }

    /// Post phase on an already-failing dispatch: interceptor errors here
    /// cannot change the outcome, so they are logged and swallowed.
    async fn run_post_phase(
        &self,
        chain: Option<&EndpointInvocationChain>,
        index: Option<usize>,
        ctx: &mut MessageContext,
    ) {
        if let Err(error) = self.trigger_handle_response(chain, index, ctx).await {
            tracing::warn!(%error, "interceptor failed during the post phase");
        }
    }
}

#[async_trait]
impl MessageReceiver for MessageDispatcher {
    async fn receive(&self, ctx: &mut MessageContext) -> Result<(), DispatchError> {
        let started = Instant::now();
        tracing::debug!(
            target: "soapwire::tracing::received",
            payload = ?ctx.request().payload_root(),
            "received request"
        );
        let result = self.dispatch(ctx).await;
        let elapsed = started.elapsed();
        match &result {
            Ok(()) if ctx.has_response() => tracing::debug!(
                target: "soapwire::tracing::sent",
                ?elapsed,
                payload = ?ctx.response().and_then(|r| r.payload_root()),
                "sent response"
            ),
            Ok(()) => tracing::debug!(
                target: "soapwire::tracing::sent",
                ?elapsed,
                "no response produced"
            ),
            Err(error) => tracing::warn!(
                target: "soapwire::tracing::sent",
                ?elapsed,
                %error,
                "dispatch failed"
            ),
        }
        result
    }
}

// ---------------------------------------------------------------------------
// DispatcherBuilder
// ---------------------------------------------------------------------------

/// Builder for `MessageDispatcher`.
///
/// Adapters and resolvers default when never touched: the built-in message
/// and payload endpoint adapters, and the catch-all SOAP exception resolver.
/// Setting either list explicitly (even to empty) replaces the default.
/// Mappings have no default; a dispatcher without mappings rejects every
/// request.
pub struct DispatcherBuilder {
    mappings: Vec<Arc<dyn EndpointMapping>>,
    adapters: Option<Vec<Arc<dyn EndpointAdapter>>>,
    resolvers: Option<Vec<Arc<dyn EndpointExceptionResolver>>>,
    precheck: Option<Arc<dyn RequestPrecheck>>,
}

impl DispatcherBuilder {
    fn new() -> Self {
        Self {
            mappings: Vec::new(),
            adapters: None,
            resolvers: None,
            precheck: None,
        }
    }

    /// Append an endpoint mapping; mappings are consulted in this order.
    #[must_use]
    pub fn add_mapping(mut self, mapping: Arc<dyn EndpointMapping>) -> Self {
        self.mappings.push(mapping);
        self
    }

    /// Replace the adapter list, disabling the defaults.
    #[must_use]
    pub fn adapters(mut self, adapters: Vec<Arc<dyn EndpointAdapter>>) -> Self {
        self.adapters = Some(adapters);
        self
    }

    /// Append an adapter, disabling the defaults on first use.
    #[must_use]
    pub fn add_adapter(mut self, adapter: Arc<dyn EndpointAdapter>) -> Self {
        self.adapters.get_or_insert_with(Vec::new).push(adapter);
        self
    }

    /// Replace the resolver list, disabling the default.
    #[must_use]
    pub fn resolvers(mut self, resolvers: Vec<Arc<dyn EndpointExceptionResolver>>) -> Self {
        self.resolvers = Some(resolvers);
        self
    }

    /// Append an exception resolver, disabling the default on first use.
    #[must_use]
    pub fn add_resolver(mut self, resolver: Arc<dyn EndpointExceptionResolver>) -> Self {
        self.resolvers.get_or_insert_with(Vec::new).push(resolver);
        self
    }

    /// Install the request pre-check hook.
    #[must_use]
    pub fn precheck(mut self, precheck: Arc<dyn RequestPrecheck>) -> Self {
        self.precheck = Some(precheck);
        self
    }

    /// Build the dispatcher, filling in defaults for untouched lists.
    #[must_use]
    pub fn build(self) -> MessageDispatcher {
        let adapters = self.adapters.unwrap_or_else(|| {
            vec![
                Arc::new(MessageEndpointAdapter),
                Arc::new(PayloadEndpointAdapter),
            ]
        });
        let resolvers = self
            .resolvers
            .unwrap_or_else(|| vec![Arc::new(SimpleSoapExceptionResolver)]);
        MessageDispatcher {
            mappings: self.mappings,
            adapters,
            resolvers,
            precheck: self.precheck,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
