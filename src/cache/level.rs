use super::{super::promise::*, error::*, fetchable::*};

use std::{ops::*, sync::*};

//
// CacheLevel
//

/// Cache level.
///
/// Levels are interchangeable wherever this capability is expected, whether they store values
/// (e.g. in memory) or only produce them (e.g. over the network), so that they can be composed
/// into pipelines regardless of storage or transport.
pub trait CacheLevel<KeyT>
where
    Self: 'static + Send + Sync,
    KeyT: Fetchable,
{
    /// Value.
    type Value: 'static + Clone + Send;

    /// Get a value.
    ///
    /// The returned [Deferred] settles exactly once, when the value is known or definitely
    /// unavailable.
    fn get(&self, key: &KeyT) -> Deferred<Self::Value, CacheError>;

    /// Get a value, with callbacks.
    ///
    /// Exactly one of the callbacks will be called, exactly once, unless the request is
    /// cancelled, in which case neither will be.
    fn get_with<OnSuccessT, OnFailureT>(
        &self,
        key: &KeyT,
        on_success: OnSuccessT,
        on_failure: OnFailureT,
    ) -> Deferred<Self::Value, CacheError>
    where
        Self: Sized,
        OnSuccessT: 'static + FnOnce(Self::Value) + Send,
        OnFailureT: 'static + FnOnce(CacheError) + Send,
    {
        let deferred = self.get(key);
        deferred.on_success(on_success).on_failure(on_failure);
        deferred
    }

    /// Set a value.
    ///
    /// Best-effort. Levels that only produce values may ignore it.
    fn set(&self, value: Self::Value, key: &KeyT);

    /// Drop all state owned by this level.
    fn clear(&self);

    /// Memory is low.
    ///
    /// Levels with bounded in-memory storage should evict.
    fn on_memory_warning(&self);
}

impl<KeyT, CacheLevelT> CacheLevel<KeyT> for Arc<CacheLevelT>
where
    KeyT: Fetchable,
    CacheLevelT: CacheLevel<KeyT>,
{
    type Value = CacheLevelT::Value;

    fn get(&self, key: &KeyT) -> Deferred<Self::Value, CacheError> {
        self.deref().get(key)
    }

    fn set(&self, value: Self::Value, key: &KeyT) {
        self.deref().set(value, key)
    }

    fn clear(&self) {
        self.deref().clear()
    }

    fn on_memory_warning(&self) {
        self.deref().on_memory_warning()
    }
}
