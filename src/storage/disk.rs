use crate::{
    locators::{Local, Locator},
    objects::{Identity, TranscriptFile, TranscriptFileKind, TranscriptRecord},
    storage::{EraseReport, TranscriptReader, TranscriptStore, TranscriptStoreFactory},
    CoordinatorError,
};

use async_trait::async_trait;
use fs_err::tokio as fs;
use futures::future::try_join_all;
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::io::BufReader;
use tracing::{debug, info, warn};

/// Returns `true` if `path` exists, treating only "not found" as absence.
pub(crate) async fn path_exists(path: &Path) -> Result<bool, CoordinatorError> {
    match fs::metadata(path).await {
        Ok(_) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(error) => Err(error.into()),
    }
}

/// Creates one `DiskTranscriptStore` per ceremony name under a common store path.
#[derive(Debug, Clone)]
pub struct DiskTranscriptStoreFactory {
    store_path: PathBuf,
}

impl DiskTranscriptStoreFactory {
    #[inline]
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
        }
    }
}

impl TranscriptStoreFactory for DiskTranscriptStoreFactory {
    type Store = DiskTranscriptStore;

    fn create(&self, name: &str) -> Result<Self::Store, CoordinatorError> {
        DiskTranscriptStore::new(&self.store_path, name)
    }
}

///
/// A transcript store backed by the local filesystem.
///
/// Transcripts are moved between lifecycle areas with `rename`, so uploaded
/// source files must live on the same filesystem as the store.
///
#[derive(Debug, Clone)]
pub struct DiskTranscriptStore {
    locator: Local,
}

impl DiskTranscriptStore {
    ///
    /// Creates a new instance of `DiskTranscriptStore` for the ceremony `name`,
    /// creating every lifecycle directory that does not exist yet.
    ///
    pub fn new(store_path: &Path, name: &str) -> Result<Self, CoordinatorError> {
        let locator = Local::new(store_path, name);

        // Fail fast if the store path is not writable.
        for directory in locator.directories() {
            fs_err::create_dir_all(directory)?;
        }

        debug!("Opened transcript store {} under {}", name, store_path.display());
        Ok(Self { locator })
    }

    /// Lists the records of one participant directory, sorted by sequence number.
    async fn records(
        &self,
        directory: &Path,
        include_signatures: bool,
    ) -> Result<Vec<TranscriptRecord>, CoordinatorError> {
        let mut entries = match fs::read_dir(directory).await {
            Ok(entries) => entries,
            // A participant without any files in this area is a normal state.
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(error) => return Err(error.into()),
        };

        let mut files = vec![];
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let file = match file_name.to_str().and_then(TranscriptFile::parse) {
                Some(file) => file,
                None => {
                    warn!("Skipping unrecognized file {:?} in {}", file_name, directory.display());
                    continue;
                }
            };

            let is_listed = match file.kind {
                TranscriptFileKind::Transcript => true,
                TranscriptFileKind::Signature => include_signatures,
                TranscriptFileKind::SealingOutput => false,
            };
            if is_listed {
                files.push((file, entry.path()));
            }
        }

        let mut records = try_join_all(files.into_iter().map(|(file, path)| async move {
            let size = fs::metadata(&path).await?.len();
            Ok::<_, CoordinatorError>((file, TranscriptRecord {
                num: file.num,
                size,
                path,
            }))
        }))
        .await?;

        records.sort_by_key(|(file, _)| *file);
        Ok(records.into_iter().map(|(_, record)| record).collect())
    }

    /// Removes every entry of `directory` and then the directory itself.
    async fn erase_directory(&self, directory: &Path) -> EraseReport {
        let mut report = EraseReport::default();

        let mut entries = match fs::read_dir(directory).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return report,
            Err(error) => {
                report.record_failure(directory, error);
                return report;
            }
        };

        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => remove_file(&entry.path(), &mut report).await,
                Ok(None) => break,
                Err(error) => {
                    report.record_failure(directory, error);
                    break;
                }
            }
        }

        match fs::remove_dir(directory).await {
            Ok(()) => report.record_removed(directory),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => report.record_failure(directory, error),
        }

        report
    }
}

/// Removes a single file, recording the outcome in `report`.
async fn remove_file(path: &Path, report: &mut EraseReport) {
    match fs::remove_file(path).await {
        Ok(()) => report.record_removed(path),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => report.record_failure(path, error),
    }
}

impl Locator for DiskTranscriptStore {
    #[inline]
    fn initial_params_directory(&self) -> &Path {
        self.locator.initial_params_directory()
    }

    #[inline]
    fn verified_directory(&self) -> &Path {
        self.locator.verified_directory()
    }

    #[inline]
    fn unverified_directory(&self) -> &Path {
        self.locator.unverified_directory()
    }

    #[inline]
    fn sealing_path(&self) -> &Path {
        self.locator.sealing_path()
    }
}

#[async_trait]
impl TranscriptStore for DiskTranscriptStore {
    async fn save(
        &self,
        identity: &Identity,
        num: u64,
        transcript_source: &Path,
        signature_source: &Path,
    ) -> Result<(), CoordinatorError> {
        // Check both sources before moving anything, so a missing signature
        // never leaves a transcript behind without one.
        for source in [transcript_source, signature_source] {
            if !path_exists(source).await? {
                return Err(CoordinatorError::MissingSourceFile(source.to_path_buf()));
            }
        }

        fs::create_dir_all(self.unverified_base_path(identity)).await?;

        let transcript_path = self.unverified_transcript_path(identity, num);
        let signature_path = self.unverified_signature_path(identity, num);
        fs::rename(transcript_source, &transcript_path).await?;
        fs::rename(signature_source, &signature_path).await?;

        debug!("Saved unverified transcript {} for {}", num, identity);
        Ok(())
    }

    async fn make_live(&self, identity: &Identity) -> Result<(), CoordinatorError> {
        let unverified = self.unverified_base_path(identity);
        let verified = self.verified_base_path(identity);

        if !path_exists(&unverified).await? {
            return Err(CoordinatorError::MissingUnverified(identity.clone()));
        }
        // Renaming onto an existing empty directory succeeds on most platforms,
        // so an existing destination is rejected explicitly.
        if path_exists(&verified).await? {
            return Err(CoordinatorError::VerifiedAlreadyExists(identity.clone()));
        }

        fs::rename(&unverified, &verified).await?;

        info!("Promoted the transcripts of {} to verified", identity);
        Ok(())
    }

    async fn load_transcript(&self, identity: &Identity, num: u64) -> Result<TranscriptReader, CoordinatorError> {
        let file = fs::File::open(self.verified_transcript_path(identity, num)).await?;
        Ok(BufReader::new(file))
    }

    async fn load_initial_params(&self) -> Result<TranscriptReader, CoordinatorError> {
        let file = fs::File::open(self.initial_params_path()).await?;
        Ok(BufReader::new(file))
    }

    async fn initial_params_size(&self) -> Result<u64, CoordinatorError> {
        Ok(fs::metadata(self.initial_params_path()).await?.len())
    }

    async fn initial_params_exists(&self) -> bool {
        fs::metadata(self.initial_params_path()).await.is_ok()
    }

    async fn set_initial_params(&self, source: &Path) -> Result<(), CoordinatorError> {
        let path = self.initial_params_path();
        if path_exists(&path).await? {
            return Err(CoordinatorError::InitialParamsAlreadySet(path));
        }
        if !path_exists(source).await? {
            return Err(CoordinatorError::MissingSourceFile(source.to_path_buf()));
        }

        fs::create_dir_all(self.initial_params_directory()).await?;
        fs::rename(source, &path).await?;

        info!("Stored the initial parameters at {}", path.display());
        Ok(())
    }

    async fn transcript_signature(&self, identity: &Identity, num: u64) -> Result<String, CoordinatorError> {
        Ok(fs::read_to_string(self.verified_signature_path(identity, num)).await?)
    }

    async fn verified(
        &self,
        identity: &Identity,
        include_signatures: bool,
    ) -> Result<Vec<TranscriptRecord>, CoordinatorError> {
        self.records(&self.verified_base_path(identity), include_signatures)
            .await
    }

    async fn unverified(
        &self,
        identity: &Identity,
        include_signatures: bool,
    ) -> Result<Vec<TranscriptRecord>, CoordinatorError> {
        self.records(&self.unverified_base_path(identity), include_signatures)
            .await
    }

    async fn erase_all(&self, identity: &Identity) -> EraseReport {
        let mut report = self.erase_directory(&self.verified_base_path(identity)).await;
        report.extend(self.erase_unverified(identity, None).await);

        debug!("Erased all transcripts of {}", identity);
        report
    }

    async fn erase_unverified(&self, identity: &Identity, num: Option<u64>) -> EraseReport {
        match num {
            Some(num) => {
                let mut report = EraseReport::default();
                remove_file(&self.unverified_transcript_path(identity, num), &mut report).await;
                report
            }
            None => self.erase_directory(&self.unverified_base_path(identity)).await,
        }
    }

    async fn copy_verified_to(&self, identity: &Identity, destination: &Path) -> Result<u64, CoordinatorError> {
        let mut num = 0;
        loop {
            let source = self.verified_transcript_path(identity, num);
            if !path_exists(&source).await? {
                break;
            }
            fs::copy(&source, destination.join(TranscriptFile::transcript(num).file_name())).await?;
            num += 1;
        }

        debug!("Copied {} verified transcripts of {} to {}", num, identity, destination.display());
        Ok(num)
    }
}
