use {
    http::StatusCode,
    std::{error::Error, sync::*},
};

/// Shareable type-erased error.
///
/// Shareable because a settled outcome is delivered to any number of observers.
pub type CapturedError = Arc<dyn Error + Send + Sync>;

//
// CacheError
//

/// Cache level error.
#[derive(Clone, Debug, thiserror::Error)]
pub enum CacheError {
    /// Payload is shorter than its declared length.
    #[error("invalid payload length: declared {declared}, received {received}")]
    InvalidPayloadLength {
        /// Declared length.
        declared: u64,

        /// Received length.
        received: usize,
    },

    /// Status code is not 200.
    #[error("invalid status code: {0}")]
    InvalidStatusCode(StatusCode),

    /// No payload.
    #[error("empty response")]
    EmptyResponse,

    /// Transport failure.
    #[error("transport: {0}")]
    Transport(CapturedError),

    /// Key cannot be used as a URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Key not stored in this level.
    #[error("not found")]
    NotFound,
}

impl CacheError {
    /// Capture a transport error.
    pub fn transport<ErrorT>(error: ErrorT) -> Self
    where
        ErrorT: Into<Box<dyn Error + Send + Sync>>,
    {
        Self::Transport(Arc::from(error.into()))
    }

    /// Domain code for payload validation errors.
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::InvalidPayloadLength { .. } => Some(9),
            Self::InvalidStatusCode(_) => Some(10),
            Self::EmptyResponse => Some(11),
            _ => None,
        }
    }
}
