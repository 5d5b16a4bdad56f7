use crate::locators::Locator;

use std::path::{Path, PathBuf};

pub(crate) const INITIAL_DIRECTORY: &str = "initial";
pub(crate) const VERIFIED_DIRECTORY: &str = "verified";
pub(crate) const UNVERIFIED_DIRECTORY: &str = "unverified";
pub(crate) const SEALING_DIRECTORY: &str = "sealed";

///
/// The on-disk layout of one ceremony's transcripts.
///
/// ```text
/// {store_path}/initial/initial_params
/// {store_path}/{name}/verified/{identity}/transcript{N}.{dat,sig}
/// {store_path}/{name}/unverified/{identity}/transcript{N}.{dat,sig}
/// {store_path}/{name}/sealed/transcript{N}.dat
/// ```
///
/// The initial parameters are shared by every ceremony rooted under the same
/// store path.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    initial_params_directory: PathBuf,
    verified_directory: PathBuf,
    unverified_directory: PathBuf,
    sealing_directory: PathBuf,
}

impl Local {
    /// Creates the layout for the ceremony `name` under `store_path`.
    pub fn new(store_path: &Path, name: &str) -> Self {
        let ceremony_directory = store_path.join(name);
        Self {
            initial_params_directory: store_path.join(INITIAL_DIRECTORY),
            verified_directory: ceremony_directory.join(VERIFIED_DIRECTORY),
            unverified_directory: ceremony_directory.join(UNVERIFIED_DIRECTORY),
            sealing_directory: ceremony_directory.join(SEALING_DIRECTORY),
        }
    }

    /// Returns the four lifecycle directories of this layout.
    pub fn directories(&self) -> [&Path; 4] {
        [
            self.initial_params_directory.as_path(),
            self.verified_directory.as_path(),
            self.unverified_directory.as_path(),
            self.sealing_directory.as_path(),
        ]
    }
}

impl Locator for Local {
    #[inline]
    fn initial_params_directory(&self) -> &Path {
        &self.initial_params_directory
    }

    #[inline]
    fn verified_directory(&self) -> &Path {
        &self.verified_directory
    }

    #[inline]
    fn unverified_directory(&self) -> &Path {
        &self.unverified_directory
    }

    #[inline]
    fn sealing_path(&self) -> &Path {
        &self.sealing_directory
    }
}
