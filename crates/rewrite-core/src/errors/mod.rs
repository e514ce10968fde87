//! Error taxonomy for the rewrite engine.
//!
//! One enum per failure domain: load errors
//! (binary detection, I/O on read), writeback errors (I/O on write), and
//! engine errors (pool lifecycle, batch orchestration). Each carries a
//! short stable `error_code()` for callers that key off of a code rather
//! than matching on `Display` text.

mod error_code;
mod engine_error;
mod load_error;
mod writeback_error;

pub use error_code::ErrorCode;
pub use engine_error::EngineError;
pub use load_error::LoadError;
pub use writeback_error::WritebackError;
