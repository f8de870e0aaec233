//! Codec sessions and the engine contract they implement.

use crate::codec::Codec;
use crate::error::{ErrorKind, Result, raise_codec, raise_construction};
use crate::codec::LzmaStream;
use crate::options::{Check, DecoderFlags, Filter, Preset, build_filters, lzma_options};
use crate::raw::RawStream;
use crate::worker::Worker;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::instrument;
use xz2::stream::Stream;

/// Whether sessions can run their coder on a worker thread.
pub const ASYNC_CODE_AVAILABLE: bool = true;

/// One submission to a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Chunk {
    Data(Vec<u8>),
    /// End of input: flush the coder and finish the stream.
    End,
}

impl Chunk {
    /// An empty data chunk also ends the input.
    pub fn is_end(&self) -> bool {
        match self {
            Chunk::Data(data) => data.is_empty(),
            Chunk::End => true,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Chunk::Data(data) => data,
            Chunk::End => &[],
        }
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(data: Vec<u8>) -> Self {
        Chunk::Data(data)
    }
}

impl From<&[u8]> for Chunk {
    fn from(data: &[u8]) -> Self {
        Chunk::Data(data.to_vec())
    }
}

/// A signal from a session to its completion handler. Exactly one payload
/// per invocation.
#[derive(Debug)]
pub enum Completion {
    /// A block of coded output.
    Output(Vec<u8>),
    /// This many of the oldest outstanding chunks have been fully consumed.
    Processed(usize),
    /// The coded stream is complete; no more output follows.
    Finished,
    /// The coder failed; no more output follows.
    Failed(crate::error::Error),
}

/// The single callback a session reports completions through.
pub type CompletionHandler = Box<dyn FnMut(Completion) + Send>;

pub(crate) type SharedCodec = Arc<Mutex<Codec>>;
pub(crate) type SharedHandler = Arc<Mutex<Option<CompletionHandler>>>;

/// The fixed set of operations a stream adapter may call on its engine.
pub trait Engine: Send {
    /// Register the completion handler, replacing any previous one.
    fn set_completion_handler(&mut self, handler: CompletionHandler);

    /// Submit one chunk. With `asynchronous` set the chunk is coded on a
    /// worker thread; otherwise it is coded before this returns. Results are
    /// only ever reported through the completion handler.
    fn code(&mut self, chunk: Chunk, asynchronous: bool) -> Result<()>;

    fn memlimit_set(&mut self, limit: u64) -> Result<()>;

    fn memlimit(&self) -> u64;

    /// Bytes consumed so far.
    fn total_in(&self) -> u64;

    /// Bytes produced so far.
    fn total_out(&self) -> u64;
}

/// One configured coder plus the machinery to drive it inline or on a
/// worker thread.
pub struct Session {
    codec: SharedCodec,
    handler: SharedHandler,
    worker: Option<Worker>,
    ended: bool,
}

impl Session {
    fn new(stream: impl LzmaStream + 'static) -> Self {
        Self {
            codec: Arc::new(Mutex::new(Codec::new(stream))),
            handler: Arc::new(Mutex::new(None)),
            worker: None,
            ended: false,
        }
    }

    #[instrument(level = "debug", skip(filters), fields(filters = filters.len()))]
    pub fn raw_encoder(filters: &[Filter]) -> Result<Self> {
        Ok(Self::new(RawStream::encoder(filters)?))
    }

    #[instrument(level = "debug", skip(filters), fields(filters = filters.len()))]
    pub fn raw_decoder(filters: &[Filter]) -> Result<Self> {
        Ok(Self::new(RawStream::decoder(filters)?))
    }

    #[instrument(level = "debug")]
    pub fn easy_encoder(preset: Preset, check: Check) -> Result<Self> {
        Ok(Self::new(Stream::new_easy_encoder(preset.as_raw(), check.into()).map_err(raise_construction)?))
    }

    #[instrument(level = "debug", skip(filters), fields(filters = filters.len()))]
    pub fn stream_encoder(filters: &[Filter], check: Check) -> Result<Self> {
        let filters = build_filters(filters)?;
        Ok(Self::new(Stream::new_stream_encoder(&filters, check.into()).map_err(raise_construction)?))
    }

    /// `memlimit` of `None` means no limit.
    #[instrument(level = "debug")]
    pub fn stream_decoder(memlimit: Option<u64>, flags: DecoderFlags) -> Result<Self> {
        let memlimit = memlimit.unwrap_or(u64::MAX);
        Ok(Self::new(Stream::new_stream_decoder(memlimit, flags.bits()).map_err(raise_construction)?))
    }

    /// Decoder for either `.xz` or legacy `.lzma` input, chosen from the
    /// input's first bytes.
    #[instrument(level = "debug")]
    pub fn auto_decoder(memlimit: Option<u64>, flags: DecoderFlags) -> Result<Self> {
        let memlimit = memlimit.unwrap_or(u64::MAX);
        Ok(Self::new(Stream::new_auto_decoder(memlimit, flags.bits()).map_err(raise_construction)?))
    }

    #[instrument(level = "debug")]
    pub fn alone_decoder(memlimit: Option<u64>) -> Result<Self> {
        let memlimit = memlimit.unwrap_or(u64::MAX);
        Ok(Self::new(Stream::new_lzma_decoder(memlimit).map_err(raise_construction)?))
    }

    #[instrument(level = "debug")]
    pub fn alone_encoder(preset: Preset) -> Result<Self> {
        let options = lzma_options(&Filter::lzma1(preset))?;
        Ok(Self::new(Stream::new_lzma_encoder(&options).map_err(raise_construction)?))
    }

    fn has_handler(&self) -> bool {
        self.handler.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    fn code_inline(&mut self, chunk: Chunk) {
        let handler = Arc::clone(&self.handler);
        let mut emit = move |completion: Completion| dispatch(&handler, completion);
        {
            let mut codec = self.codec.lock().unwrap_or_else(PoisonError::into_inner);
            codec.feed(chunk.as_bytes(), chunk.is_end(), &mut emit);
        }
        emit(Completion::Processed(1));
    }
}

impl Engine for Session {
    fn set_completion_handler(&mut self, handler: CompletionHandler) {
        *self.handler.lock().unwrap_or_else(PoisonError::into_inner) = Some(handler);
    }

    fn code(&mut self, chunk: Chunk, asynchronous: bool) -> Result<()> {
        if self.ended {
            exn::bail!(ErrorKind::Closed);
        }
        if !self.has_handler() {
            exn::bail!(ErrorKind::NoHandler);
        }
        self.ended = chunk.is_end();

        // Once a worker owns the coder, everything goes through it to keep
        // submission order.
        if asynchronous || self.worker.is_some() {
            let worker = match self.worker.take() {
                Some(worker) => worker,
                None => Worker::spawn(Arc::clone(&self.codec), Arc::clone(&self.handler))?,
            };
            self.worker.insert(worker).send(chunk)
        } else {
            self.code_inline(chunk);
            Ok(())
        }
    }

    fn memlimit_set(&mut self, limit: u64) -> Result<()> {
        let mut codec = self.codec.lock().unwrap_or_else(PoisonError::into_inner);
        let stream = codec.stream_mut().ok_or_else(|| exn::Exn::from(ErrorKind::Closed))?;
        stream.set_memlimit(limit).map_err(|err| {
            raise_codec(err).raise(ErrorKind::InvalidOption(format!("memlimit {limit} not accepted by this coder")))
        })
    }

    fn memlimit(&self) -> u64 {
        let codec = self.codec.lock().unwrap_or_else(PoisonError::into_inner);
        codec.stream().map_or(0, |stream| stream.memlimit())
    }

    fn total_in(&self) -> u64 {
        self.codec.lock().unwrap_or_else(PoisonError::into_inner).total_in()
    }

    fn total_out(&self) -> u64 {
        self.codec.lock().unwrap_or_else(PoisonError::into_inner).total_out()
    }
}

/// Hand a completion to the registered handler, if any.
pub(crate) fn dispatch(handler: &SharedHandler, completion: Completion) {
    if let Some(handler) = handler.lock().unwrap_or_else(PoisonError::into_inner).as_mut() {
        handler(completion);
    }
}
