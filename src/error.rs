//! Error taxonomy for the density analysis core
//!
//! The core fails fast and reports the offending parameters. Whether a failing
//! (run, block count) pair aborts a sweep or is skipped is decided by the
//! orchestrator, never here.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by decoding, partitioning and statistics
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Malformed dump row or byte value
    #[error("Malformed dump record at line {line}: {reason}")]
    Format { line: usize, reason: String },

    /// Block count incompatible with the bit array
    #[error("Cannot partition {len} bits into {blocks} blocks: {reason}")]
    Partition {
        blocks: usize,
        len: usize,
        reason: String,
    },

    /// Standard deviation requested over too few observations
    #[error("Standard deviation needs at least 2 samples, got {samples}")]
    DegenerateSample { samples: usize },

    /// Missing or unreadable input file or directory
    #[error("Cannot access {}: {source}", path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Report could not be serialized
    #[error("Failed to render report: {0}")]
    Render(#[from] serde_json::Error),
}

/// Result type for analysis operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    pub(crate) fn format(line: usize, reason: impl Into<String>) -> Self {
        Self::Format {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn partition(blocks: usize, len: usize, reason: impl Into<String>) -> Self {
        Self::Partition {
            blocks,
            len,
            reason: reason.into(),
        }
    }

    pub(crate) fn resource(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Resource {
            path: path.into(),
            source,
        }
    }
}
