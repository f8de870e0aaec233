//! Declarative stream options and the request forms a stream can be created
//! from.

use crate::error::{ErrorKind, Result};
use lzstream_engine::{Check, Coder, DecoderFlags, Filter, Preset};
use serde::{Deserialize, Serialize};

/// Options understood by every coder; each coder reads the ones it needs.
///
/// | Coder | Options read |
/// |---|---|
/// | raw encoder/decoder | `filters` |
/// | easy encoder | `preset`, `check` |
/// | stream encoder | `filters` (LZMA2 at `preset` when empty), `check` |
/// | stream/auto decoder | `memlimit`, `flags` |
/// | alone decoder | `memlimit` |
/// | alone encoder | `preset` |
///
/// `synchronous` and `force_asynchronous` pick the stream's [`Mode`] and are
/// mutually exclusive.
///
/// [`Mode`]: crate::Mode
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    pub preset: Preset,
    pub check: Check,
    pub filters: Vec<Filter>,
    /// Decoder memory ceiling in bytes. `None` means unlimited.
    pub memlimit: Option<u64>,
    pub flags: DecoderFlags,
    pub synchronous: bool,
    pub force_asynchronous: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_preset(mut self, preset: Preset) -> Self {
        self.preset = preset;
        self
    }

    #[must_use]
    pub fn with_check(mut self, check: Check) -> Self {
        self.check = check;
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters = filters.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_memlimit(mut self, memlimit: u64) -> Self {
        self.memlimit = Some(memlimit);
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: DecoderFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn synchronous(mut self) -> Self {
        self.synchronous = true;
        self
    }

    #[must_use]
    pub fn force_asynchronous(mut self) -> Self {
        self.force_asynchronous = true;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.synchronous && self.force_asynchronous {
            exn::bail!(ErrorKind::ConflictingMode);
        }
        Ok(())
    }
}

impl From<Preset> for Options {
    fn from(preset: Preset) -> Self {
        Self::new().with_preset(preset)
    }
}

/// What to build a stream from.
///
/// Requests without a coder build an easy encoder. Requests without options
/// use the factory's defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamRequest {
    Coder(Coder, Option<Options>),
    Options(Options),
    /// A bare preset level, possibly with the extreme flag bit set.
    Preset(u32),
}

impl StreamRequest {
    /// Settle on a coder and a complete set of options.
    pub fn resolve(self, defaults: &Options) -> Result<(Coder, Options)> {
        let (coder, options) = match self {
            StreamRequest::Coder(coder, options) => (coder, options.unwrap_or_else(|| defaults.clone())),
            StreamRequest::Options(options) => (Coder::EasyEncoder, options),
            StreamRequest::Preset(raw) => (
                Coder::EasyEncoder,
                defaults.clone().with_preset(Preset::try_from(raw)?),
            ),
        };
        options.validate()?;
        Ok((coder, options))
    }
}

impl From<Coder> for StreamRequest {
    fn from(coder: Coder) -> Self {
        StreamRequest::Coder(coder, None)
    }
}

impl From<(Coder, Options)> for StreamRequest {
    fn from((coder, options): (Coder, Options)) -> Self {
        StreamRequest::Coder(coder, Some(options))
    }
}

impl From<Options> for StreamRequest {
    fn from(options: Options) -> Self {
        StreamRequest::Options(options)
    }
}

impl From<u32> for StreamRequest {
    fn from(preset: u32) -> Self {
        StreamRequest::Preset(preset)
    }
}
