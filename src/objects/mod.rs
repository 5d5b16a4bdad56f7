pub mod ceremony;
pub use ceremony::*;

pub mod engine_message;
pub use engine_message::*;

pub mod identity;
pub use identity::*;

pub mod transcript;
pub use transcript::*;
