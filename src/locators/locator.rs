use crate::objects::{Identity, TranscriptFile};

use std::path::{Path, PathBuf};

pub(crate) const INITIAL_PARAMS_FILE: &str = "initial_params";

///
/// Path accessors for every file the coordinator stores.
///
/// All methods are pure: they build paths and never touch the filesystem.
/// No other component should construct a storage path by hand.
///
pub trait Locator {
    /// Returns the ceremony-wide directory holding the initial parameters.
    fn initial_params_directory(&self) -> &Path;

    /// Returns the directory holding one subdirectory per verified participant.
    fn verified_directory(&self) -> &Path;

    /// Returns the directory holding one subdirectory per unverified participant.
    fn unverified_directory(&self) -> &Path;

    /// Returns the scratch directory used by the sealer.
    fn sealing_path(&self) -> &Path;

    /// Returns the path of the initial parameters file.
    fn initial_params_path(&self) -> PathBuf {
        self.initial_params_directory().join(INITIAL_PARAMS_FILE)
    }

    /// Returns the verified directory for a given participant.
    fn verified_base_path(&self, identity: &Identity) -> PathBuf {
        self.verified_directory().join(identity.as_str())
    }

    /// Returns the unverified directory for a given participant.
    fn unverified_base_path(&self, identity: &Identity) -> PathBuf {
        self.unverified_directory().join(identity.as_str())
    }

    fn verified_transcript_path(&self, identity: &Identity, num: u64) -> PathBuf {
        self.verified_base_path(identity)
            .join(TranscriptFile::transcript(num).file_name())
    }

    fn verified_signature_path(&self, identity: &Identity, num: u64) -> PathBuf {
        self.verified_base_path(identity)
            .join(TranscriptFile::signature(num).file_name())
    }

    fn unverified_transcript_path(&self, identity: &Identity, num: u64) -> PathBuf {
        self.unverified_base_path(identity)
            .join(TranscriptFile::transcript(num).file_name())
    }

    fn unverified_signature_path(&self, identity: &Identity, num: u64) -> PathBuf {
        self.unverified_base_path(identity)
            .join(TranscriptFile::signature(num).file_name())
    }
}
