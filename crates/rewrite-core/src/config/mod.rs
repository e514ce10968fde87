//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the batch rewrite engine.
///
/// Mirrors the "integer `max_threads`" and "implicit page-size
/// constant" inputs, wrapped in a serde/TOML-loadable struct with
/// `effective_*()` accessors that resolve defaults, the way scan-style
/// config structs in this codebase's lineage do.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of worker threads. `None`/`Some(0)` means auto-detect:
    /// `min(files * 2, hardware_concurrency * 1.5)`, clamped to at least 1.
    pub max_threads: Option<usize>,
    /// Target page size in Unicode scalar values. Default: 16384.
    pub page_size: Option<usize>,
    /// Number of raw bytes inspected by the binary-file heuristic. Default: 1024.
    pub binary_check_window: Option<usize>,
    /// NUL-byte percentage threshold (of the inspected window) above which a
    /// file is treated as binary. Default: 1.0 (percent).
    pub binary_null_threshold_pct: Option<f64>,
}

pub const DEFAULT_PAGE_SIZE: usize = 16 * 1024;
pub const DEFAULT_BINARY_CHECK_WINDOW: usize = 1024;
pub const DEFAULT_BINARY_NULL_THRESHOLD_PCT: f64 = 1.0;
/// Width of the newline/space snap-back window used by the pager.
pub const BOUNDARY_SNAP_WINDOW: usize = 100;

impl EngineConfig {
    /// Returns the configured thread count, defaulting to 0 (auto-detect).
    pub fn effective_max_threads(&self) -> usize {
        self.max_threads.unwrap_or(0)
    }

    /// Returns the effective page size, defaulting to 16 KiB-equivalent scalars.
    pub fn effective_page_size(&self) -> usize {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    /// Returns the effective binary-detection window in bytes, defaulting to 1024.
    pub fn effective_binary_check_window(&self) -> usize {
        self.binary_check_window.unwrap_or(DEFAULT_BINARY_CHECK_WINDOW)
    }

    /// Returns the effective NUL-byte percentage threshold, defaulting to 1.0.
    pub fn effective_binary_null_threshold_pct(&self) -> f64 {
        self.binary_null_threshold_pct
            .unwrap_or(DEFAULT_BINARY_NULL_THRESHOLD_PCT)
    }

    /// Parses an `EngineConfig` from TOML text, as loaded from `rewrite.toml`.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
