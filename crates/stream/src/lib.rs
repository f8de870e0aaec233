//! LZMA/XZ compression as asynchronous byte streams.
//!
//! Build a [`StreamAdapter`] from a [`StreamFactory`] (or the crate-level
//! shortcuts, which use [`StreamFactory::shared`]), write chunks into it as a
//! [`Sink`](futures::Sink) and read coded output from it as a
//! [`Stream`](futures::Stream). Coding runs on a per-stream worker thread, or
//! inline once too many asynchronous streams are active (see
//! [`ConcurrencyThrottle`]).
//!
//! ```no_run
//! # async fn run() -> lzstream::error::Result<()> {
//! let compressed = lzstream::compress("some text", None)?.await?;
//! assert!(lzstream::is_xz(&compressed));
//! let original = lzstream::decompress(compressed, None)?.await?;
//! assert_eq!(original, b"some text");
//! # Ok(())
//! # }
//! ```

mod adapter;
mod checksum;
pub mod error;
mod factory;
mod input;
mod oneshot;
mod options;
mod sniff;
mod throttle;

pub use crate::adapter::{ChunkCallback, StreamAdapter};
pub use crate::checksum::crc32;
pub use crate::factory::StreamFactory;
pub use crate::input::{Encoding, Input};
pub use crate::oneshot::{FinishCallback, OneShot, ProgressCallback};
pub use crate::options::{Options, StreamRequest};
pub use crate::sniff::{XZ_MAGIC, is_xz};
pub use crate::throttle::{ConcurrencyThrottle, MAX_ASYNC_STREAM_COUNT, Mode, ThrottleTicket};
pub use lzstream_engine::{
    ASYNC_CODE_AVAILABLE, BUFFER_SIZE, Check, Chunk, Coder, DecoderFlags, Engine, Filter, FilterId, FilterOptions,
    PRESET_DEFAULT, PRESET_EXTREME, Preset, Session,
};

use crate::error::Result;

/// Build a stream with the shared factory.
pub fn create_stream(request: impl Into<StreamRequest>) -> Result<StreamAdapter> {
    StreamFactory::shared().create_stream(request)
}

pub fn create_compressor(options: impl Into<Option<Options>>) -> Result<StreamAdapter> {
    StreamFactory::shared().create_compressor(options)
}

pub fn create_decompressor(options: impl Into<Option<Options>>) -> Result<StreamAdapter> {
    StreamFactory::shared().create_decompressor(options)
}

/// Compress all of `input` into one `.xz` buffer.
pub fn compress(input: impl Into<Input>, options: impl Into<Option<Options>>) -> Result<OneShot> {
    StreamFactory::shared().compress(input, options)
}

/// Decompress all of `input`, which may be `.xz` or legacy `.lzma`.
pub fn decompress(input: impl Into<Input>, options: impl Into<Option<Options>>) -> Result<OneShot> {
    StreamFactory::shared().decompress(input, options)
}

pub fn compress_lzma(input: impl Into<Input>, level: u32) -> Result<OneShot> {
    StreamFactory::shared().compress_lzma(input, level)
}
