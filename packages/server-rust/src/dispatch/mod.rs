//! Message dispatch framework.
//!
//! This module implements the request-to-response pipeline:
//!
//! 1. **Mapping** (`mapping`): `MessageContext` -> `EndpointInvocationChain`
//! 2. **Pre-check** (`soap`): SOAP mustUnderstand header validation
//! 3. **Interceptors** (`interceptor`): pre/post/fault hooks around invocation
//! 4. **Adapters** (`adapter`): bridge opaque endpoints to an invocation call
//! 5. **Resolvers** (`resolver`): convert endpoint errors into SOAP faults
//!
//! `dispatcher::MessageDispatcher` orchestrates all five.

pub mod adapter;
pub mod config;
pub mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod interceptor;
pub mod mapping;
pub mod resolver;
pub mod soap;

// Re-export key types for convenient access.
pub use adapter::{EndpointAdapter, MessageEndpointAdapter, PayloadEndpointAdapter};
pub use config::DispatcherConfig;
pub use dispatcher::{DispatcherBuilder, MessageDispatcher, MessageReceiver, RequestPrecheck};
pub use endpoint::{
    DynEndpoint, EndpointInvocationChain, MessageEndpoint, PayloadEndpoint,
};
pub use error::{DispatchError, EndpointError, ErrorClass, ErrorKind};
pub use interceptor::{EndpointInterceptor, PayloadLoggingInterceptor, SoapEndpointInterceptor};
pub use mapping::{EndpointMapping, PayloadRootMapping, SoapActionMapping};
pub use resolver::{
    EndpointExceptionResolver, FaultDefinition, FaultMappingExceptionResolver,
    SimpleSoapExceptionResolver,
};
pub use soap::MustUnderstandChecker;
