//! File loading and the binary-file heuristic.
//!
//! Invalid UTF-8 is decoded best-effort via `String::from_utf8_lossy`,
//! which substitutes the Unicode replacement scalar for invalid byte
//! sequences.

use std::fs;
use std::path::Path;

use rewrite_core::config::EngineConfig;
use rewrite_core::errors::LoadError;

/// Reads `path` and returns its content as scalar values, or a
/// [`LoadError`] if the file can't be read or is detected as binary.
pub fn load_text_file(path: &Path, config: &EngineConfig) -> Result<Vec<char>, LoadError> {
    let bytes = fs::read(path).map_err(|e| LoadError::IoReadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(nul_count) = detect_binary(&bytes, config) {
        return Err(LoadError::InputNotText {
            path: path.to_path_buf(),
            nul_count,
            window: config.effective_binary_check_window().min(bytes.len()),
        });
    }

    Ok(String::from_utf8_lossy(&bytes).chars().collect())
}

/// Returns `Some(nul_count)` if `bytes` looks binary: the fraction of NUL
/// bytes in the first `binary_check_window` bytes strictly exceeds
/// `binary_null_threshold_pct` percent. Returns `None` for text files.
fn detect_binary(bytes: &[u8], config: &EngineConfig) -> Option<usize> {
    let window_len = config.effective_binary_check_window().min(bytes.len());
    if window_len == 0 {
        return None;
    }
    let window = &bytes[..window_len];
    let nul_count = window.iter().filter(|&&b| b == 0).count();
    let nul_pct = nul_count as f64 / window_len as f64 * 100.0;
    if nul_pct >= config.effective_binary_null_threshold_pct() {
        Some(nul_count)
    } else {
        None
    }
}
