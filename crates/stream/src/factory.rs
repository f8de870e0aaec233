use crate::adapter::StreamAdapter;
use crate::error::Result;
use crate::input::Input;
use crate::oneshot::OneShot;
use crate::options::{Options, StreamRequest};
use crate::throttle::{ConcurrencyThrottle, Mode};
use lzstream_engine::{ASYNC_CODE_AVAILABLE, Coder, Engine, Filter, PRESET_LEVEL_MAX, Preset, Session};
use std::sync::OnceLock;
use tracing::{debug, instrument};

/// Builds configured streams.
///
/// The factory owns the [`ConcurrencyThrottle`] its asynchronous streams
/// register with, and the default [`Options`] used by requests that carry
/// none. [`StreamFactory::shared`] is the process-wide instance behind the
/// crate-level functions.
#[derive(Clone, Debug)]
pub struct StreamFactory {
    throttle: ConcurrencyThrottle,
    defaults: Options,
    async_available: bool,
}

impl StreamFactory {
    pub fn new(throttle: ConcurrencyThrottle) -> Self {
        Self {
            throttle,
            defaults: Options::default(),
            async_available: ASYNC_CODE_AVAILABLE,
        }
    }

    pub fn shared() -> &'static StreamFactory {
        static SHARED: OnceLock<StreamFactory> = OnceLock::new();
        SHARED.get_or_init(StreamFactory::default)
    }

    #[must_use]
    pub fn with_defaults(mut self, defaults: Options) -> Self {
        self.defaults = defaults;
        self
    }

    /// Without asynchronous coding every stream is created synchronous.
    #[must_use]
    pub fn with_async_available(mut self, available: bool) -> Self {
        self.async_available = available;
        self
    }

    pub fn throttle(&self) -> &ConcurrencyThrottle {
        &self.throttle
    }

    pub fn defaults(&self) -> &Options {
        &self.defaults
    }

    /// Build a ready stream. Invalid options fail here, before any data is
    /// coded.
    #[instrument(level = "debug", skip_all)]
    pub fn create_stream(&self, request: impl Into<StreamRequest>) -> Result<StreamAdapter> {
        let (coder, options) = request.into().resolve(&self.defaults)?;
        let session = open_session(coder, &options)?;
        Ok(self.adapt(session, &options))
    }

    /// Wrap an already configured engine, choosing its mode and registering
    /// it with the throttle when it ends up asynchronous.
    pub fn adapt<E: Engine>(&self, engine: E, options: &Options) -> StreamAdapter<E> {
        let ticket = self
            .throttle
            .admit_and_register(options.synchronous || !self.async_available, options.force_asynchronous);
        let mode = if ticket.is_some() { Mode::Asynchronous } else { Mode::Synchronous };
        debug!(%mode, "stream created");
        StreamAdapter::new(engine, mode, ticket)
    }

    /// `.xz` compressor built from `options.preset` and `options.check`.
    pub fn create_compressor(&self, options: impl Into<Option<Options>>) -> Result<StreamAdapter> {
        self.create_stream(StreamRequest::Coder(Coder::EasyEncoder, options.into()))
    }

    /// Same as [`create_compressor`](Self::create_compressor) with the preset
    /// given separately; it takes precedence over `options.preset`.
    pub fn create_compressor_with_preset(
        &self,
        preset: Preset,
        options: impl Into<Option<Options>>,
    ) -> Result<StreamAdapter> {
        let options = options.into().unwrap_or_else(|| self.defaults.clone()).with_preset(preset);
        self.create_stream((Coder::EasyEncoder, options))
    }

    /// Decompressor for `.xz` or legacy `.lzma` input.
    pub fn create_decompressor(&self, options: impl Into<Option<Options>>) -> Result<StreamAdapter> {
        self.create_stream(StreamRequest::Coder(Coder::AutoDecoder, options.into()))
    }

    pub fn compress(&self, input: impl Into<Input>, options: impl Into<Option<Options>>) -> Result<OneShot> {
        self.code_all(Coder::EasyEncoder, input, options)
    }

    pub fn decompress(&self, input: impl Into<Input>, options: impl Into<Option<Options>>) -> Result<OneShot> {
        self.code_all(Coder::AutoDecoder, input, options)
    }

    /// Legacy `.lzma` compression with the preset given as a bare level.
    /// Levels outside `1..=9` keep the default preset. The result decodes
    /// with [`decompress`](Self::decompress).
    pub fn compress_lzma(&self, input: impl Into<Input>, level: u32) -> Result<OneShot> {
        let mut options = self.defaults.clone();
        if (1..=PRESET_LEVEL_MAX).contains(&level) {
            options = options.with_preset(Preset::new(level)?);
        }
        self.code_all(Coder::AloneEncoder, input, options)
    }

    /// Run all of `input` through a new `coder` stream. The stream is built
    /// immediately; the returned job does the coding.
    #[instrument(level = "debug", skip_all, fields(%coder))]
    pub fn code_all(
        &self,
        coder: Coder,
        input: impl Into<Input>,
        options: impl Into<Option<Options>>,
    ) -> Result<OneShot> {
        let mut adapter = self.create_stream(StreamRequest::Coder(coder, options.into()))?;
        let input = input.into().into_bytes();
        debug!(size = input.len(), "one-shot job prepared");
        Ok(OneShot::new(async move {
            adapter.write(input).await?;
            adapter.finish().await
        }))
    }
}

impl Default for StreamFactory {
    fn default() -> Self {
        Self::new(ConcurrencyThrottle::default())
    }
}

fn open_session(coder: Coder, options: &Options) -> Result<Session> {
    let mut session = match coder {
        Coder::RawEncoder => Session::raw_encoder(&options.filters)?,
        Coder::RawDecoder => Session::raw_decoder(&options.filters)?,
        Coder::EasyEncoder => Session::easy_encoder(options.preset, options.check)?,
        Coder::StreamEncoder if options.filters.is_empty() => {
            Session::stream_encoder(&[Filter::lzma2(options.preset)], options.check)?
        },
        Coder::StreamEncoder => Session::stream_encoder(&options.filters, options.check)?,
        Coder::StreamDecoder => Session::stream_decoder(options.memlimit, options.flags)?,
        Coder::AutoDecoder => Session::auto_decoder(options.memlimit, options.flags)?,
        Coder::AloneDecoder => Session::alone_decoder(options.memlimit)?,
        Coder::AloneEncoder => Session::alone_encoder(options.preset)?,
    };
    match options.memlimit {
        Some(limit) if coder.accepts_memlimit() => session.memlimit_set(limit)?,
        Some(limit) => debug!(%coder, limit, "coder has no memory limit, ignoring"),
        None => {},
    }
    Ok(session)
}
