//! Layered settings for building `lzstream` factories.
//!
//! Settings start from built-in defaults, then an optional file (TOML, YAML or
//! JSON), then `LZSTREAM_*` environment variables. [`Settings::factory`] turns
//! them into a configured [`lzstream::StreamFactory`].

pub mod error;
mod settings;

pub use crate::settings::{ENV_PREFIX, Settings, default_path};
