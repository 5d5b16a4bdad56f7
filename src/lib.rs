pub mod cli;
pub mod commands;
pub mod environment;
pub mod errors;
pub mod locators;
pub mod logger;
pub mod objects;
pub mod storage;

pub use commands::{Sealer, SealerState};
pub use errors::CoordinatorError;
pub use locators::Locator;
pub use objects::{CeremonyState, Identity, ParticipantRecord, ParticipantState, TranscriptRecord};
pub use storage::{DiskTranscriptStore, DiskTranscriptStoreFactory, EraseReport, TranscriptStore, TranscriptStoreFactory};

#[cfg(test)]
mod testing;
