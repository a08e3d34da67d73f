use super::super::dispatch::*;

use {
    http::*,
    std::{sync::*, time::*},
};

//
// FetcherConfiguration
//

/// Network fetcher configuration.
#[derive(Clone)]
pub struct FetcherConfiguration {
    /// Completion context.
    pub dispatcher: DispatcherRef,

    /// Optional request timeout.
    pub request_timeout: Option<Duration>,

    /// Optional `User-Agent` header.
    pub user_agent: Option<HeaderValue>,
}

impl Default for FetcherConfiguration {
    fn default() -> Self {
        Self {
            dispatcher: Arc::new(InlineDispatcher),
            request_timeout: None,
            user_agent: None,
        }
    }
}

//
// ConfigurationError
//

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// Invalid duration.
    #[error("invalid duration {0:?}: {1}")]
    InvalidDuration(String, String),

    /// Invalid header value.
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] header::InvalidHeaderValue),
}
