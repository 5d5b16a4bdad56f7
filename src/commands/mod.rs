pub mod sealing;
pub use sealing::*;
