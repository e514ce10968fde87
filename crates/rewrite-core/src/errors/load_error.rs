use std::path::PathBuf;

use super::error_code::{self, ErrorCode};

/// Errors that can occur while a file is loaded and decoded for processing.
///
/// `InputNotText` and `IoReadError` both surface to the caller as
/// `ProcessingResult { ok: false, err_msg: "Failed to load file content" }`
/// — the distinction is kept here for logging, but collapses at the
/// `ProcessingResult` boundary.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{path}: detected as binary ({nul_count} NUL bytes in first {window} bytes)")]
    InputNotText {
        path: PathBuf,
        nul_count: usize,
        window: usize,
    },

    #[error("{path}: failed to read file: {message}")]
    IoReadError { path: PathBuf, message: String },
}

impl LoadError {
    /// The message surfaced on `ProcessingResult.err_msg` for this failure;
    /// both variants share the same caller-facing text.
    pub fn caller_message(&self) -> &'static str {
        "Failed to load file content"
    }
}

impl ErrorCode for LoadError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InputNotText { .. } => error_code::INPUT_NOT_TEXT,
            Self::IoReadError { .. } => error_code::IO_READ_ERROR,
        }
    }
}
