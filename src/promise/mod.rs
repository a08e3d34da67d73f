mod deferred;
mod outcome;
mod promise;

#[allow(unused_imports)]
pub use {deferred::*, outcome::*, promise::*};
