pub mod local;
pub use local::*;

pub mod locator;
pub use locator::*;
