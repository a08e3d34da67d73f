/// Moka implementation.
#[cfg(feature = "moka")]
pub mod moka;
