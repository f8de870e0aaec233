//! Configuration Error Types

use derive_more::{Display, Error};
use lzstream::error::ErrorKind as StreamErrorKind;
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The settings file does not exist.
    #[display("settings file not found: {}", _0.display())]
    NotFound(#[error(not(source))] PathBuf),
    /// A source could not be read or parsed. Fix the file or environment.
    #[display("could not load settings")]
    Load,
    /// Settings parsed but hold a value that cannot be used.
    #[display("invalid setting: {_0}")]
    Invalid(#[error(not(source))] String),
    /// The stream layer rejected the configured options.
    #[display("stream error: {_0}")]
    Stream(StreamErrorKind),
}

impl ErrorKind {
    /// Wrap a stream error, keeping its error tree as a child.
    #[track_caller]
    pub fn stream(err: lzstream::error::Error) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Stream(inner))
    }
}
