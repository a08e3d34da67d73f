mod configuration;
mod fetcher;
mod request;
mod transport;
mod validate;

/// Reqwest transport.
#[cfg(feature = "reqwest")]
pub mod reqwest;

#[allow(unused_imports)]
pub use {configuration::*, fetcher::*, request::*, transport::*, validate::*};
