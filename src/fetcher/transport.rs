use super::super::cache::*;

use {
    bytes::*,
    http::{Request, Response},
    std::{error::Error, sync::*},
    tower::*,
};

/// Transport request.
///
/// Always a GET without a body.
pub type TransportRequest = Request<()>;

/// Transport response.
///
/// A [None] body means that there is no payload at all, as opposed to an empty one. The declared
/// payload length, if any, is the `Content-Length` header.
pub type TransportResponse = Response<Option<Bytes>>;

//
// TransportError
//

/// Transport error.
#[derive(Clone, Debug, thiserror::Error)]
pub enum TransportError {
    /// The request was cancelled.
    ///
    /// This is not a failure.
    #[error("cancelled")]
    Cancelled,

    /// The request failed.
    #[error("{0}")]
    Failed(CapturedError),
}

impl TransportError {
    /// Capture a failure.
    pub fn failed<ErrorT>(error: ErrorT) -> Self
    where
        ErrorT: Into<Box<dyn Error + Send + Sync>>,
    {
        Self::Failed(Arc::from(error.into()))
    }
}

//
// Transport
//

/// Network transport.
///
/// Any Tower [Service] from [TransportRequest] to [TransportResponse] will do, which means that
/// Tower middleware (retries, rate limiting, etc.) can be layered on top. Tests can use
/// [service_fn].
///
/// Each call must produce exactly one result.
pub trait Transport
where
    Self: 'static
        + Clone
        + Send
        + Sync
        + Service<
            TransportRequest,
            Response = TransportResponse,
            Error = TransportError,
            Future: Send,
        >,
{
}

impl<ServiceT> Transport for ServiceT where
    ServiceT: 'static
        + Clone
        + Send
        + Sync
        + Service<
            TransportRequest,
            Response = TransportResponse,
            Error = TransportError,
            Future: Send,
        >
{
}
