use crate::{
    locators::Locator,
    objects::{Identity, TranscriptRecord},
    storage::EraseReport,
    CoordinatorError,
};

use async_trait::async_trait;
use fs_err::tokio::File;
use std::path::Path;
use tokio::io::BufReader;

/// A buffered, sequential reader over one stored file.
pub type TranscriptReader = BufReader<File>;

///
/// A standard model for transcript storage.
///
/// Each operation is atomic on its own, but the store does not queue or lock
/// calls for the same identity. Callers must serialize operations that target
/// the same identity; for example, `save` racing with `erase_unverified` for one
/// participant has no defined order. Operations on different identities may run
/// concurrently.
///
#[async_trait]
pub trait TranscriptStore: Locator + Send + Sync {
    /// Moves a transcript and its signature into the unverified area of `identity` at `num`.
    async fn save(
        &self,
        identity: &Identity,
        num: u64,
        transcript_source: &Path,
        signature_source: &Path,
    ) -> Result<(), CoordinatorError>;

    /// Promotes every unverified transcript of `identity` to verified in one rename.
    async fn make_live(&self, identity: &Identity) -> Result<(), CoordinatorError>;

    /// Opens the verified transcript of `identity` at `num` for reading.
    async fn load_transcript(&self, identity: &Identity, num: u64) -> Result<TranscriptReader, CoordinatorError>;

    /// Opens the initial parameters for reading.
    async fn load_initial_params(&self) -> Result<TranscriptReader, CoordinatorError>;

    /// Returns the size of the initial parameters in bytes.
    async fn initial_params_size(&self) -> Result<u64, CoordinatorError>;

    /// Returns `true` if the initial parameters exist. Otherwise, returns `false`.
    async fn initial_params_exists(&self) -> bool;

    /// Moves the initial parameters into place. Fails if they already exist.
    async fn set_initial_params(&self, source: &Path) -> Result<(), CoordinatorError>;

    /// Returns the contents of the verified signature of `identity` at `num`.
    async fn transcript_signature(&self, identity: &Identity, num: u64) -> Result<String, CoordinatorError>;

    /// Returns the verified records of `identity`, sorted by sequence number.
    async fn verified(
        &self,
        identity: &Identity,
        include_signatures: bool,
    ) -> Result<Vec<TranscriptRecord>, CoordinatorError>;

    /// Returns the unverified records of `identity`, sorted by sequence number.
    async fn unverified(
        &self,
        identity: &Identity,
        include_signatures: bool,
    ) -> Result<Vec<TranscriptRecord>, CoordinatorError>;

    /// Removes the verified and unverified areas of `identity`, on a best-effort basis.
    async fn erase_all(&self, identity: &Identity) -> EraseReport;

    ///
    /// Removes the unverified transcript of `identity` at `num`, leaving its signature,
    /// or the whole unverified area if `num` is `None`, on a best-effort basis.
    ///
    async fn erase_unverified(&self, identity: &Identity, num: Option<u64>) -> EraseReport;

    ///
    /// Copies the verified transcripts of `identity` into `destination`, starting
    /// at sequence number 0 and stopping at the first one missing.
    /// Returns the number of transcripts copied.
    ///
    async fn copy_verified_to(&self, identity: &Identity, destination: &Path) -> Result<u64, CoordinatorError>;
}

/// Creates one transcript store per ceremony name.
pub trait TranscriptStoreFactory {
    type Store: TranscriptStore;

    fn create(&self, name: &str) -> Result<Self::Store, CoordinatorError>;
}
