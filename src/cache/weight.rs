use bytes::*;

//
// CacheWeight
//

/// Cache weight.
pub trait CacheWeight {
    /// Cache weight as a byte count.
    ///
    /// It is *not* the amount of memory used, but rather an indicator of *potential* storage
    /// requirements.
    ///
    /// Note that *sums* of weights can be misleading in terms of memory use because there might be
    /// memory shared between items, e.g. via the use of [Bytes].
    fn cache_weight(&self) -> usize;
}

impl CacheWeight for Bytes {
    fn cache_weight(&self) -> usize {
        const SELF_SIZE: usize = size_of::<Bytes>();
        SELF_SIZE + self.len()
    }
}

impl CacheWeight for String {
    fn cache_weight(&self) -> usize {
        const SELF_SIZE: usize = size_of::<String>();
        SELF_SIZE + self.len()
    }
}

impl CacheWeight for Vec<u8> {
    fn cache_weight(&self) -> usize {
        const SELF_SIZE: usize = size_of::<Vec<u8>>();
        SELF_SIZE + self.len()
    }
}
