//! Folder aggregation: walk a plugin tree and build its node registry.

mod files;
mod runner;

pub use files::{collect_files, relative_label, FileWalk};
pub use runner::{analyze_unit, ScanResult, ScannedNode, Scanner, SkippedFile};

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for scan operations.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors raised while scanning.
///
/// `Io`, `Encoding`, `Parse` and `Language` are per-file: a directory scan
/// records them as [`SkippedFile`]s and continues. The rest abort the scan.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The scan root does not exist.
    #[error("root not found: {}", path.display())]
    RootNotFound { path: PathBuf },

    /// The scan root is not a directory.
    #[error("not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    /// A file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// An `excluded_paths` pattern does not compile.
    #[error("invalid excluded_paths pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// The file could not be parsed.
    #[error("parse failure in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The file is not valid UTF-8.
    #[error("not valid UTF-8: {}", path.display())]
    Encoding { path: PathBuf },

    /// Two files registered the same node name under the `error` policy.
    #[error("node {name:?} registered by both {previous} and {current}")]
    Collision {
        name: String,
        previous: String,
        current: String,
    },

    /// No loader handles the file's extension.
    #[error("no loader for extension {extension:?}")]
    Language { extension: String },
}

impl ScanError {
    /// Whether a directory scan skips the file instead of failing.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            ScanError::Io { .. }
                | ScanError::Parse { .. }
                | ScanError::Encoding { .. }
                | ScanError::Language { .. }
        )
    }
}
