use super::{
    super::{compose::*, promise::*},
    error::*,
    fetchable::*,
    level::*,
};

use std::sync::*;

//
// TieredLevel
//

/// Two-tiered [CacheLevel].
///
/// The assumption is that the first level is faster than the next. A value that is missing from
/// the first level but found in the next is written back into the first.
///
/// For more tiers you can chain this type.
#[derive(Debug)]
pub struct TieredLevel<FirstT, NextT> {
    /// First level.
    pub first: Arc<FirstT>,

    /// Next level.
    pub next: Arc<NextT>,
}

impl<FirstT, NextT> TieredLevel<FirstT, NextT> {
    /// Constructor.
    pub fn new(first: FirstT, next: NextT) -> Self {
        Self {
            first: Arc::new(first),
            next: Arc::new(next),
        }
    }
}

impl<FirstT, NextT> Clone for TieredLevel<FirstT, NextT> {
    fn clone(&self) -> Self {
        Self {
            first: self.first.clone(),
            next: self.next.clone(),
        }
    }
}

impl<KeyT, FirstT, NextT> CacheLevel<KeyT> for TieredLevel<FirstT, NextT>
where
    KeyT: Clone + Fetchable,
    FirstT: CacheLevel<KeyT>,
    NextT: CacheLevel<KeyT, Value = FirstT::Value>,
{
    type Value = FirstT::Value;

    fn get(&self, key: &KeyT) -> Deferred<Self::Value, CacheError> {
        let promise = Promise::new();
        let tiered = promise.deferred();

        let first_request = self.first.get(key);
        cancel_with(&tiered, &first_request);

        let first = self.first.clone();
        let next = self.next.clone();
        let key = key.clone();

        first_request
            .on_success({
                let promise = promise.clone();
                move |value| {
                    promise.succeed(value);
                }
            })
            .on_cancel({
                let promise = promise.clone();
                move || {
                    promise.cancel();
                }
            })
            .on_failure({
                let tiered = tiered.clone();
                move |error| {
                    if !tiered.is_pending() {
                        return;
                    }

                    tracing::debug!("first level failed ({}): {}", error, key.fetchable_key());

                    let next_request = next.get(&key);
                    cancel_with(&tiered, &next_request);

                    next_request.on_success(move |value| {
                        tracing::debug!("writing back: {}", key.fetchable_key());
                        first.set(value, &key);
                    });
                    forward(&next_request, promise);
                }
            });

        tiered
    }

    fn set(&self, value: Self::Value, key: &KeyT) {
        self.first.set(value.clone(), key);
        self.next.set(value, key)
    }

    fn clear(&self) {
        self.first.clear();
        self.next.clear()
    }

    fn on_memory_warning(&self) {
        self.first.on_memory_warning();
        self.next.on_memory_warning()
    }
}
