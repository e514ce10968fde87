//! # rewrite-core
//!
//! Foundation crate for the rewrite engine workspace.
//! Defines the shared data contracts, error taxonomy, and configuration
//! used by the matcher, scanner, and engine crates. Every other crate in
//! the workspace depends on this one.

pub mod config;
pub mod errors;
pub mod types;

pub use config::EngineConfig;
pub use errors::{EngineError, ErrorCode, LoadError, WritebackError};
pub use types::{
    FileContent, Page, PageResult, ProcessingResult, ProtectedInterval, ProtectedRegionSpec,
    ReplacementMap, ReplacementMapError, Rule, WritebackNotification,
};
