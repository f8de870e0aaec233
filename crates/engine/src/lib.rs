//! Session-oriented LZMA/XZ codec engine.
//!
//! This crate wraps liblzma (through [`xz2`], and `lzma-sys` for the raw
//! coders) behind a small, callback-driven contract, the [`Engine`] trait:
//!
//! - **Sessions** are built from one of the coder constructors on
//!   [`Session`] (raw, easy, stream, auto, alone) and own their coder
//!   exclusively.
//! - **Submission** hands one [`Chunk`] at a time to [`Engine::code`],
//!   either coded inline on the calling thread or queued for a per-session
//!   worker thread.
//! - **Completion** is reported through a single registered
//!   [`CompletionHandler`]: output blocks, counts of consumed chunks, the end
//!   of the stream, or a failure.
//!
//! The engine does no buffering of its own beyond the codec's, and never
//! decides on ordering or flow control; that is left to the stream layer.

mod checksum;
mod codec;
mod coder;
pub mod error;
#[cfg(feature = "mock")]
mod mock;
mod options;
mod raw;
mod session;
mod worker;

pub use crate::checksum::crc32;
pub use crate::codec::BUFFER_SIZE;
pub use crate::coder::Coder;
#[cfg(feature = "mock")]
pub use crate::mock::MockEngine;
pub use crate::options::{
    Check, DecoderFlags, FILTERS_MAX, Filter, FilterId, FilterOptions, PRESET_DEFAULT, PRESET_EXTREME,
    PRESET_LEVEL_MAX, Preset,
};
pub use crate::session::{ASYNC_CODE_AVAILABLE, Chunk, Completion, CompletionHandler, Engine, Session};
