use super::{
    super::super::{super::promise::*, error::*, fetchable::*, level::*, weight::*},
    builder::*,
};

use {moka::sync::Cache, std::fmt};

//
// MemoryLevel
//

/// In-memory [CacheLevel] backed by Moka.
///
/// Note that it is based on the `sync` version of Moka cache rather than its `future` version,
/// because [CacheLevel::get] returns a [Deferred] without awaiting anything.
///
/// Cloning is cheap and clones refer to the same storage.
#[derive(Clone)]
pub struct MemoryLevel<ValueT> {
    cache: Cache<String, ValueT>,
}

impl<ValueT> MemoryLevel<ValueT>
where
    ValueT: 'static + Clone + Send + Sync,
{
    /// Constructor.
    pub fn new(cache: Cache<String, ValueT>) -> Self {
        Self { cache }
    }

    /// Constructor with a [CacheWeight] weigher.
    ///
    /// Note that `max_capacity` is not a promise for the actual maximum memory use, but is rather
    /// a limit for the total of cache entry weights.
    pub fn with_max_capacity(max_capacity: u64) -> Self
    where
        ValueT: CacheWeight,
    {
        Self::new(
            Cache::<String, ValueT>::builder()
                .name("memory")
                .for_payload()
                .max_capacity(max_capacity)
                .eviction_listener(|key, _value, cause| {
                    tracing::debug!("evict ({:?}): {}", cause, key);
                })
                .build(),
        )
    }

    /// Number of stored entries.
    ///
    /// Runs pending maintenance first, so that the count is accurate.
    pub fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }
}

impl<ValueT> fmt::Debug for MemoryLevel<ValueT>
where
    ValueT: 'static + Clone + fmt::Debug + Send + Sync,
{
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("MemoryLevel")
            .field("name", &self.cache.name())
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl<KeyT, ValueT> CacheLevel<KeyT> for MemoryLevel<ValueT>
where
    KeyT: Fetchable,
    ValueT: 'static + Clone + Send + Sync,
{
    type Value = ValueT;

    fn get(&self, key: &KeyT) -> Deferred<ValueT, CacheError> {
        let key = key.fetchable_key();
        match self.cache.get(key) {
            Some(value) => {
                tracing::debug!("hit: {}", key);
                Deferred::succeeded(value)
            }

            None => {
                tracing::debug!("miss: {}", key);
                Deferred::failed(CacheError::NotFound)
            }
        }
    }

    fn set(&self, value: ValueT, key: &KeyT) {
        self.cache.insert(key.fetchable_key().into(), value)
    }

    fn clear(&self) {
        self.cache.invalidate_all()
    }

    fn on_memory_warning(&self) {
        tracing::info!("memory warning: evicting {} entries", self.cache.entry_count());
        self.cache.invalidate_all();
        self.cache.run_pending_tasks()
    }
}
