//! Error taxonomy for the dispatch pipeline.

// ---------------------------------------------------------------------------
// EndpointError
// ---------------------------------------------------------------------------

/// Errors raised by endpoints, adapters, interceptors, and mappings during a
/// dispatch. These are recoverable: the dispatcher offers them to the
/// exception-resolver chain before giving up.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("endpoint processing failed: {0}")]
    Processing(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl EndpointError {
    /// The kind of this error, used for fault mapping and for choosing
    /// sender-vs-receiver fault codes.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Processing(_) => ErrorKind::Processing,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

// ---------------------------------------------------------------------------
// ErrorKind / ErrorClass
// ---------------------------------------------------------------------------

/// Flat classification of an `EndpointError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    Unauthorized,
    Processing,
    Internal,
}

impl ErrorKind {
    /// Whether this kind blames the message sender (SOAP `Sender`/`Client`
    /// fault) rather than the receiving node.
    #[must_use]
    pub fn is_client(self) -> bool {
        matches!(self, Self::InvalidRequest | Self::Unauthorized)
    }
}

/// Matching class for fault-mapping rules, ordered from most to least
/// specific.
///
/// Replaces the source system's superclass-walk over exception types with an
/// explicit depth function: an exact kind matches at depth 0, the client or
/// server side matches its kinds at depth 1, and `Any` matches everything at
/// depth 2. Smallest depth wins; ties go to the earlier registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Matches every error (catch-all).
    Any,
    /// Matches client-side kinds (`InvalidRequest`, `Unauthorized`).
    Client,
    /// Matches server-side kinds (`Processing`, `Internal`).
    Server,
    /// Matches exactly one kind.
    Kind(ErrorKind),
}

impl ErrorClass {
    /// Matching depth for the given kind: `Some(0)` for an exact kind match,
    /// `Some(1)` for a side match, `Some(2)` for the catch-all, `None` when
    /// this class does not match the kind at all.
    #[must_use]
    pub fn depth(self, kind: ErrorKind) -> Option<u32> {
        match self {
            Self::Kind(k) if k == kind => Some(0),
            Self::Kind(_) => None,
            Self::Client if kind.is_client() => Some(1),
            Self::Server if !kind.is_client() => Some(1),
            Self::Client | Self::Server => None,
            Self::Any => Some(2),
        }
    }
}

// ---------------------------------------------------------------------------
// DispatchError
// ---------------------------------------------------------------------------

/// Terminal outcome of a failed dispatch, reported to the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No endpoint mapping matched the request. Fatal for the request; no
    /// interceptors run and no resolvers are consulted.
    #[error("no endpoint mapping found for request")]
    NoEndpointFound,
    /// A resolved endpoint has no supporting adapter. This is a
    /// configuration defect, not a bad request.
    #[error(
        "no adapter for endpoint; does your endpoint implement a supported \
         trait like MessageEndpoint or PayloadEndpoint?"
    )]
    NoAdapterFound,
    /// An endpoint error that no exception resolver claimed, rethrown after
    /// the post/fault phase ran.
    #[error("unresolved endpoint error: {0}")]
    Unresolved(#[source] EndpointError),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
