mod dispatcher;
mod inline;
mod serial;

#[allow(unused_imports)]
pub use {dispatcher::*, inline::*, serial::*};
