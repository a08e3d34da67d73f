use std::sync::*;

//
// Fetchable
//

/// Cache key that is also a literal fetch target.
///
/// The key is used as is both for looking up cache entries and as the URL of network requests.
pub trait Fetchable
where
    Self: 'static + Send + Sync,
{
    /// Key.
    fn fetchable_key(&self) -> &str;
}

impl Fetchable for String {
    fn fetchable_key(&self) -> &str {
        self
    }
}

impl Fetchable for &'static str {
    fn fetchable_key(&self) -> &str {
        self
    }
}

impl Fetchable for Box<str> {
    fn fetchable_key(&self) -> &str {
        self
    }
}

impl Fetchable for Arc<str> {
    fn fetchable_key(&self) -> &str {
        self
    }
}
