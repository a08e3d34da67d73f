mod callback;
mod deferred;
mod optional;

#[allow(unused_imports)]
pub use {callback::*, deferred::*, optional::*};
