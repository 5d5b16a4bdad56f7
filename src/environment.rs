use std::path::{Path, PathBuf};
use tracing::Level;

pub(crate) const DEFAULT_STORE_PATH: &str = "./store";
pub(crate) const DEFAULT_SEALING_ENGINE_PATH: &str = "../setup-tools/seal";
pub(crate) const DEFAULT_CEREMONY_NAME: &str = "transcripts";

///
/// The settings a coordinator process runs with.
///
/// Every store created for this environment is rooted under `store_path`,
/// and every sealer launches the engine found at `sealing_engine_path`.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    store_path: PathBuf,
    sealing_engine_path: PathBuf,
    ceremony_name: String,
    verbosity: Level,
}

impl Environment {
    /// Creates a new instance of `Environment` with the given store root and engine path.
    #[inline]
    pub fn new(store_path: impl Into<PathBuf>, sealing_engine_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: store_path.into(),
            sealing_engine_path: sealing_engine_path.into(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn with_ceremony_name(mut self, ceremony_name: impl Into<String>) -> Self {
        self.ceremony_name = ceremony_name.into();
        self
    }

    #[inline]
    pub fn with_verbosity(mut self, verbosity: Level) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Returns the base directory every transcript store is rooted under.
    #[inline]
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Returns the path of the external sealing engine executable.
    #[inline]
    pub fn sealing_engine_path(&self) -> &Path {
        &self.sealing_engine_path
    }

    /// Returns the name of the ceremony whose store this process operates on.
    #[inline]
    pub fn ceremony_name(&self) -> &str {
        &self.ceremony_name
    }

    /// Returns the maximum level of events written by the logger.
    #[inline]
    pub fn verbosity(&self) -> &Level {
        &self.verbosity
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            sealing_engine_path: PathBuf::from(DEFAULT_SEALING_ENGINE_PATH),
            ceremony_name: DEFAULT_CEREMONY_NAME.to_string(),
            verbosity: Level::INFO,
        }
    }
}
