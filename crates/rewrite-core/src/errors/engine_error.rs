use super::error_code::{self, ErrorCode};

/// Batch- and pool-level errors. Unlike `LoadError`/`WritebackError`, these
/// originate from the orchestration layer itself rather than from one
/// file's content.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("submitted a task to a pool that has already shut down")]
    PoolSubmitError,

    #[error("Page processing exception: {0}")]
    PageProcessingError(String),
}

impl ErrorCode for EngineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::PoolSubmitError => error_code::POOL_SUBMIT_ERROR,
            Self::PageProcessingError(_) => error_code::PAGE_PROCESSING_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_report_their_stable_codes() {
        assert_eq!(EngineError::PoolSubmitError.error_code(), error_code::POOL_SUBMIT_ERROR);
        assert_eq!(EngineError::PageProcessingError("boom".into()).error_code(), error_code::PAGE_PROCESSING_ERROR);
    }
}
