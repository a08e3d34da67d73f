mod builder;
mod level;
mod weigher;

#[allow(unused_imports)]
pub use {builder::*, level::*, weigher::*};
