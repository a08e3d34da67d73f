use super::{super::super::weight::*, weigher::*};

//
// ForPayload
//

/// Add support for [CacheWeight] weigher.
pub trait ForPayload
where
    Self: Sized,
{
    /// Add support for [CacheWeight] weigher.
    fn for_payload(self) -> Self;
}

impl<ValueT> ForPayload
    for moka::sync::CacheBuilder<String, ValueT, moka::sync::Cache<String, ValueT>>
where
    ValueT: 'static + Clone + CacheWeight + Send + Sync,
{
    fn for_payload(self) -> Self {
        self.weigher(weigher)
    }
}
