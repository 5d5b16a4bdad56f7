pub mod disk;
pub use disk::*;

pub mod erase;
pub use erase::*;

pub mod storage;
pub use storage::*;
