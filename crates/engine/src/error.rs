//! Engine Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. The same error type travels through
//! the completion handler, so every variant must stay cheap to clone.

use derive_more::{Display, Error};
use xz2::stream::Error as CodecError;

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classes of failure, used to decide where an error is surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Rejected options; raised synchronously while constructing a session.
    Configuration,
    /// Raised by the codec while processing data; always delivered through
    /// the completion handler.
    EngineFault,
    /// The configured memory limit was exceeded.
    ResourceExhaustion,
}

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Preset level outside of `0..=9`.
    #[display("invalid preset: {_0}")]
    InvalidPreset(#[error(not(source))] u32),
    /// Filter chain is empty, too long, or does not end with an LZMA filter.
    #[display("invalid filter chain: {_0}")]
    InvalidFilterChain(#[error(not(source))] String),
    /// The codec rejected an option value.
    #[display("invalid option: {_0}")]
    InvalidOption(#[error(not(source))] String),
    /// The requested coder name does not exist.
    #[display("unknown coder: {_0}")]
    UnknownCoder(#[error(not(source))] String),
    /// Synchronous and forced-asynchronous modes were both requested.
    #[display("synchronous and forced asynchronous modes are mutually exclusive")]
    ConflictingMode,
    /// Data was submitted before a completion handler was registered.
    #[display("no completion handler registered")]
    NoHandler,
    /// The integrity check of the input is not supported (or not present).
    #[display("unsupported integrity check")]
    UnsupportedCheck,
    /// Data is corrupt or malformed. Don't retry with the same input.
    #[display("invalid or corrupted data")]
    InvalidData,
    /// Input is not in a container format this coder understands.
    #[display("unsupported container format")]
    UnsupportedFormat,
    /// Input ended before the compressed stream was complete.
    #[display("unexpected end of input")]
    Truncated,
    /// Decoding needs more memory than the configured limit allows.
    #[display("memory limit exceeded")]
    MemoryLimit,
    /// The codec could not allocate memory.
    #[display("out of memory")]
    OutOfMemory,
    /// The session has already ended or been released.
    #[display("session is closed")]
    Closed,
    /// The codec or the completion protocol was misused.
    #[display("internal codec error")]
    Internal,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OutOfMemory)
    }

    /// Which part of the error taxonomy this kind belongs to.
    pub fn category(&self) -> Category {
        match self {
            Self::InvalidPreset(_)
            | Self::InvalidFilterChain(_)
            | Self::InvalidOption(_)
            | Self::UnknownCoder(_)
            | Self::ConflictingMode
            | Self::NoHandler => Category::Configuration,
            Self::MemoryLimit => Category::ResourceExhaustion,
            Self::UnsupportedCheck
            | Self::InvalidData
            | Self::UnsupportedFormat
            | Self::Truncated
            | Self::OutOfMemory
            | Self::Closed
            | Self::Internal => Category::EngineFault,
        }
    }

    /// Map an error returned while *constructing* a coder. Anything other
    /// than an allocation failure means the options were unacceptable.
    pub(crate) fn from_construction(err: &CodecError) -> Self {
        match err {
            CodecError::Mem => Self::OutOfMemory,
            CodecError::UnsupportedCheck | CodecError::NoCheck => Self::UnsupportedCheck,
            other => Self::InvalidOption(other.to_string()),
        }
    }
}

impl From<&CodecError> for ErrorKind {
    fn from(err: &CodecError) -> Self {
        match err {
            CodecError::Data => Self::InvalidData,
            CodecError::Format => Self::UnsupportedFormat,
            CodecError::MemLimit => Self::MemoryLimit,
            CodecError::Mem => Self::OutOfMemory,
            CodecError::Options => Self::InvalidOption("rejected by codec".to_string()),
            CodecError::UnsupportedCheck | CodecError::NoCheck => Self::UnsupportedCheck,
            CodecError::Program => Self::Internal,
        }
    }
}

/// Wrap a codec error raised during processing, keeping it as the child of
/// the mapped [`ErrorKind`] in the error tree.
#[track_caller]
pub(crate) fn raise_codec(err: CodecError) -> Error {
    let kind = ErrorKind::from(&err);
    exn::Exn::from(err).raise(kind)
}

/// Same as [`raise_codec`], for errors raised while constructing a coder.
#[track_caller]
pub(crate) fn raise_construction(err: CodecError) -> Error {
    let kind = ErrorKind::from_construction(&err);
    exn::Exn::from(err).raise(kind)
}
