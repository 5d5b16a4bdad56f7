use crate::objects::Identity;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Initial parameters already exist at {}", .0.display())]
    InitialParamsAlreadySet(PathBuf),

    #[error("Invalid participant identity {0:?}")]
    InvalidIdentity(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("Source file {} is missing", .0.display())]
    MissingSourceFile(PathBuf),

    #[error("No unverified transcripts exist for {0}")]
    MissingUnverified(Identity),

    #[error("No previous participant to perform sealing step on")]
    NoCompletedParticipant,

    #[error("Sealer has already been started")]
    SealerAlreadyStarted,

    #[error("Sealing engine exited with code {0:?}")]
    SealingEngineFailed(Option<i32>),

    #[error("Failed to spawn sealing engine {}: {}", .path.display(), .source)]
    SealingEngineSpawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Verified transcripts already exist for {0}")]
    VerifiedAlreadyExists(Identity),
}
