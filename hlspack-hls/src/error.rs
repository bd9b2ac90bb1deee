//! Error types for the packaging layer.
//!
//! Every kind is fatal: the tool is batch and deterministic, so the
//! idiomatic recovery is rerunning into a fresh output directory.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the packager.
#[derive(Error, Debug)]
pub enum HlsError {
    /// Input container missing or unreadable.
    #[error("Cannot open input '{path}': {source}")]
    InputOpen {
        /// Offending file.
        path: PathBuf,
        /// Underlying failure.
        source: std::io::Error,
    },

    /// Container contains no movie header.
    #[error("No movie found in '{path}'")]
    NoMovie {
        /// Offending file.
        path: PathBuf,
    },

    /// Container contains neither audio nor video.
    #[error("No audio or video track in '{path}'")]
    NoMedia {
        /// Offending file.
        path: PathBuf,
    },

    /// Codec not in the supported remux table.
    #[error("Unsupported codec '{fourcc}' in '{path}'")]
    UnsupportedCodec {
        /// Sample-entry fourcc.
        fourcc: String,
        /// Offending file.
        path: PathBuf,
    },

    /// Per-rendition output directory could not be created. A pre-existing
    /// directory is also fatal.
    #[error("Cannot create output directory '{path}': {source}")]
    OutputDir {
        /// Directory path.
        path: PathBuf,
        /// Underlying failure.
        source: std::io::Error,
    },

    /// Invalid packager configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Read or write failure during segmentation.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport stream framing failure.
    #[error("Transport stream error: {0}")]
    Ts(#[from] hlspack_ts::TsError),

    /// Container parse failure.
    #[error("Container error: {0}")]
    Container(#[from] hlspack_core::Error),
}

/// Result type alias for the packaging layer.
pub type Result<T> = std::result::Result<T, HlsError>;
