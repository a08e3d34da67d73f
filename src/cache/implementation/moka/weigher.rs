use super::super::super::weight::*;

/// Moka cache entry weigher.
pub fn weigher<ValueT>(key: &String, value: &ValueT) -> u32
where
    ValueT: CacheWeight,
{
    let weight = key.cache_weight() + value.cache_weight();
    let weight = weight.try_into().unwrap_or(u32::MAX);
    tracing::debug!("{} for {}", weight, key);
    weight
}
