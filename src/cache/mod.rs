mod error;
mod fetchable;
mod level;
mod tiered;
mod weight;

/// Cache level implementations.
pub mod implementation;

#[allow(unused_imports)]
pub use {error::*, fetchable::*, level::*, tiered::*, weight::*};
