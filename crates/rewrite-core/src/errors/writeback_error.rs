use std::path::PathBuf;

use super::error_code::{self, ErrorCode};

/// Errors that can occur while a processed file is written back to disk.
#[derive(Debug, thiserror::Error)]
pub enum WritebackError {
    #[error("{path}: failed to write file: {message}")]
    IoWriteError { path: PathBuf, message: String },
}

impl ErrorCode for WritebackError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::IoWriteError { .. } => error_code::IO_WRITE_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_write_error_reports_its_code_and_message() {
        let err = WritebackError::IoWriteError { path: PathBuf::from("f.txt"), message: "disk full".into() };
        assert_eq!(err.error_code(), error_code::IO_WRITE_ERROR);
        assert!(err.to_string().contains("disk full"));
    }
}
