//! Stream Error Types
//!
//! Streams share the engine's error type: configuration problems are raised
//! while a stream is being built, and engine faults arrive through the stream
//! itself. See [`ErrorKind::category`] to tell the two apart.

pub use lzstream_engine::error::{Category, Error, ErrorKind, Result};
