//! # rewrite-engine
//!
//! The concurrency and orchestration layer: a worker
//! pool draining a shared FIFO task queue, a processor that loads files,
//! scans and pages them, and fans page work out across the pool, and a
//! dedicated writeback pipeline that serializes changed files back to
//! disk.

pub mod loader;
pub mod pool;
pub mod processor;
pub mod writeback;

pub use pool::WorkerPool;
pub use processor::{run_batch, EngineStats};
