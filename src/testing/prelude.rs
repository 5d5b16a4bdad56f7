pub use serial_test::serial;
pub use tempfile::TempDir;

use crate::{
    objects::Identity,
    storage::{DiskTranscriptStore, DiskTranscriptStoreFactory, TranscriptStore, TranscriptStoreFactory},
    CoordinatorError,
};

use std::{
    io,
    path::{Path, PathBuf},
};

/// Copies every transcript into a prefixed output and reports progress.
pub const COPYING_ENGINE: &str = r#"#!/bin/sh
dir="$1"
n=0
while [ -f "$dir/transcript$n.dat" ]; do
    { printf 'sealed '; cat "$dir/transcript$n.dat"; } > "$dir/transcript${n}_out.dat"
    n=$((n + 1))
done
echo "progress 50"
echo "unknown foo"
echo "progress 100"
echo "sealing finished" >&2
"#;

/// Writes outputs 0, 1 and 3, leaving a gap at 2.
pub const GAPPED_OUTPUT_ENGINE: &str = r#"#!/bin/sh
dir="$1"
for n in 0 1 3; do
    echo "output $n" > "$dir/transcript${n}_out.dat"
done
"#;

/// Prints bytes that are not valid UTF-8 on both streams before reporting progress.
pub const INVALID_UTF8_ENGINE: &str = r#"#!/bin/sh
printf 'status \377\n'
printf 'warning \377\n' >&2
sleep 0.3
echo "progress 50"
echo "progress 100"
echo "warning done" >&2
echo output > "$1/transcript0_out.dat"
exit 0
"#;

pub const FAILING_ENGINE: &str = r#"#!/bin/sh
echo "progress 5"
echo "out of memory" >&2
exit 3
"#;

/// Reports progress once and then runs until interrupted.
pub const HANGING_ENGINE: &str = r#"#!/bin/sh
trap 'exit 130' INT
echo "progress 10"
while true; do
    sleep 0.1
done
"#;

/// Installs a test logger, once per test binary.
pub fn initialize_test_logger() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

///
/// A transcript store rooted in a temporary directory, with an `uploads`
/// directory on the same filesystem to stage source files in.
///
pub struct TestStore {
    pub directory: TempDir,
    pub uploads: PathBuf,
    pub store: DiskTranscriptStore,
}

impl TestStore {
    pub fn new() -> Self {
        initialize_test_logger();

        let directory = tempfile::tempdir().expect("unable to create a temporary directory");
        let uploads = directory.path().join("uploads");
        std::fs::create_dir_all(&uploads).expect("unable to create the uploads directory");

        let store = DiskTranscriptStoreFactory::new(directory.path().join("store"))
            .create("transcripts")
            .expect("unable to create the transcript store");

        Self {
            directory,
            uploads,
            store,
        }
    }

    /// Stages a transcript with `contents` and its signature `signature-{num}` for upload.
    pub fn upload(&self, num: u64, contents: &[u8]) -> io::Result<(PathBuf, PathBuf)> {
        let transcript = self.uploads.join(format!("upload{}.dat", num));
        let signature = self.uploads.join(format!("upload{}.sig", num));
        std::fs::write(&transcript, contents)?;
        std::fs::write(&signature, format!("signature-{}", num))?;
        Ok((transcript, signature))
    }

    /// Saves `count` unverified transcripts `transcript-{num}` for `identity`.
    pub async fn save_transcripts(&self, identity: &Identity, count: u64) -> Result<(), CoordinatorError> {
        for num in 0..count {
            let (transcript, signature) = self.upload(num, format!("transcript-{}", num).as_bytes())?;
            self.store.save(identity, num, &transcript, &signature).await?;
        }
        Ok(())
    }
}

/// Writes an executable sealing engine script into `directory`.
#[cfg(unix)]
pub fn write_engine_script(directory: &Path, script: &str) -> io::Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = directory.join("seal.sh");
    std::fs::write(&path, script)?;
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    Ok(path)
}
