use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const FILE_PREFIX: &str = "transcript";
const TRANSCRIPT_SUFFIX: &str = ".dat";
const SIGNATURE_SUFFIX: &str = ".sig";
const SEALING_OUTPUT_SUFFIX: &str = "_out.dat";

/// One transcript or signature file held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRecord {
    /// The sequence number parsed from the file name.
    pub num: u64,
    /// The size of the file in bytes.
    pub size: u64,
    pub path: PathBuf,
}

/// The kinds of files that carry a sequence number in their name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TranscriptFileKind {
    /// `transcript<N>.dat`
    Transcript,
    /// `transcript<N>.sig`
    Signature,
    /// `transcript<N>_out.dat`, written by the sealing engine.
    SealingOutput,
}

///
/// The file name codec shared by the transcript store and the sealer.
///
/// Sequence numbers are written in decimal without leading zeros. The external
/// sealing engine relies on these names, so they must not change.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TranscriptFile {
    pub num: u64,
    pub kind: TranscriptFileKind,
}

impl TranscriptFile {
    #[inline]
    pub fn transcript(num: u64) -> Self {
        Self {
            num,
            kind: TranscriptFileKind::Transcript,
        }
    }

    #[inline]
    pub fn signature(num: u64) -> Self {
        Self {
            num,
            kind: TranscriptFileKind::Signature,
        }
    }

    #[inline]
    pub fn sealing_output(num: u64) -> Self {
        Self {
            num,
            kind: TranscriptFileKind::SealingOutput,
        }
    }

    /// Returns the file name for this sequence number and kind.
    pub fn file_name(&self) -> String {
        let suffix = match self.kind {
            TranscriptFileKind::Transcript => TRANSCRIPT_SUFFIX,
            TranscriptFileKind::Signature => SIGNATURE_SUFFIX,
            TranscriptFileKind::SealingOutput => SEALING_OUTPUT_SUFFIX,
        };
        format!("{}{}{}", FILE_PREFIX, self.num, suffix)
    }

    ///
    /// Parses a file name produced by `file_name`.
    ///
    /// Returns `None` for any name that `file_name` could not have produced,
    /// including numbers with leading zeros.
    ///
    pub fn parse(file_name: &str) -> Option<Self> {
        let rest = file_name.strip_prefix(FILE_PREFIX)?;

        // The sealing output suffix also ends in `.dat`, so it is checked first.
        let (digits, kind) = if let Some(digits) = rest.strip_suffix(SEALING_OUTPUT_SUFFIX) {
            (digits, TranscriptFileKind::SealingOutput)
        } else if let Some(digits) = rest.strip_suffix(TRANSCRIPT_SUFFIX) {
            (digits, TranscriptFileKind::Transcript)
        } else if let Some(digits) = rest.strip_suffix(SIGNATURE_SUFFIX) {
            (digits, TranscriptFileKind::Signature)
        } else {
            return None;
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if digits.len() > 1 && digits.starts_with('0') {
            return None;
        }

        let num = digits.parse().ok()?;
        Some(Self { num, kind })
    }
}
