//! The inline coding loop shared by synchronous submissions and the worker
//! thread.

use crate::error::{ErrorKind, raise_codec};
use crate::session::Completion;
use xz2::stream::{Action, Error as CodecError, Status, Stream};

/// Size of each output block handed to the completion handler.
pub const BUFFER_SIZE: usize = 8192;

/// The liblzma stream operations the coding loop needs. Implemented by xz2's
/// container coders and by [`RawStream`](crate::raw::RawStream).
pub(crate) trait LzmaStream: Send {
    fn process_vec(&mut self, input: &[u8], output: &mut Vec<u8>, action: Action) -> Result<Status, CodecError>;
    fn total_in(&self) -> u64;
    fn total_out(&self) -> u64;
    fn memlimit(&self) -> u64;
    fn set_memlimit(&mut self, limit: u64) -> Result<(), CodecError>;
}

impl LzmaStream for Stream {
    fn process_vec(&mut self, input: &[u8], output: &mut Vec<u8>, action: Action) -> Result<Status, CodecError> {
        Stream::process_vec(self, input, output, action)
    }

    fn total_in(&self) -> u64 {
        Stream::total_in(self)
    }

    fn total_out(&self) -> u64 {
        Stream::total_out(self)
    }

    fn memlimit(&self) -> u64 {
        Stream::memlimit(self)
    }

    fn set_memlimit(&mut self, limit: u64) -> Result<(), CodecError> {
        Stream::set_memlimit(self, limit)
    }
}

/// A coder plus the byte counters that outlive it.
pub(crate) struct Codec {
    stream: Option<Box<dyn LzmaStream>>,
    total_in: u64,
    total_out: u64,
}

impl Codec {
    pub(crate) fn new(stream: impl LzmaStream + 'static) -> Self {
        Self {
            stream: Some(Box::new(stream)),
            total_in: 0,
            total_out: 0,
        }
    }

    pub(crate) fn stream_mut(&mut self) -> Option<&mut (dyn LzmaStream + 'static)> {
        self.stream.as_deref_mut()
    }

    pub(crate) fn stream(&self) -> Option<&(dyn LzmaStream + 'static)> {
        self.stream.as_deref()
    }

    pub(crate) fn total_in(&self) -> u64 {
        self.total_in
    }

    pub(crate) fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Run `input` through the coder, reporting each output block through
    /// `emit`, followed by [`Completion::Finished`] or [`Completion::Failed`]
    /// if the coder reached a terminal state.
    ///
    /// With `finish` set, the coder is driven until the end of the stream.
    /// Once terminal, the coder is released and later input is ignored.
    pub(crate) fn feed(&mut self, input: &[u8], finish: bool, emit: &mut dyn FnMut(Completion)) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };
        let action = if finish { Action::Finish } else { Action::Run };
        let mut offset = 0;
        loop {
            let mut block = Vec::with_capacity(BUFFER_SIZE);
            let (in_before, out_before) = (stream.total_in(), stream.total_out());
            let result = stream.process_vec(&input[offset..], &mut block, action);
            let consumed = stream.total_in() - in_before;
            self.total_in = stream.total_in();
            self.total_out = stream.total_out();
            // Bounded by the input slice length, which is a usize.
            offset += usize::try_from(consumed).unwrap_or(usize::MAX).min(input.len() - offset);
            let produced = stream.total_out() - out_before;
            if !block.is_empty() {
                emit(Completion::Output(block));
            }

            match result {
                Ok(Status::StreamEnd) => {
                    self.release();
                    emit(Completion::Finished);
                    return;
                },
                Ok(_) => {},
                Err(err) => {
                    self.release();
                    emit(Completion::Failed(raise_codec(err)));
                    return;
                },
            }

            let stalled = consumed == 0 && produced == 0;
            if finish {
                if stalled {
                    // Finishing without progress means the coder still expects input.
                    self.release();
                    emit(Completion::Failed(exn::Exn::from(ErrorKind::Truncated)));
                    return;
                }
            } else if stalled || (offset >= input.len() && block_was_partial(produced)) {
                return;
            }
        }
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            tracing::trace!(total_in = self.total_in, total_out = self.total_out, "codec released");
        }
    }
}

/// A block that was not filled completely means the coder has nothing more
/// to flush for the input it has seen.
fn block_was_partial(produced: u64) -> bool {
    produced < BUFFER_SIZE as u64
}
