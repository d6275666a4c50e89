//! `SoapWire` Server — SOAP message dispatch: endpoint resolution, interceptor
//! chains, and exception-to-fault resolution.

pub mod dispatch;

pub use dispatch::{
    DispatchError, EndpointError, MessageDispatcher, MessageReceiver,
};

#[cfg(test)]
mod tests {
    #[test]
    fn crate_loads() {
        // Empty body: if this test runs, the crate compiles and loads.
    }
}
