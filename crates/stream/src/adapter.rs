//! Byte-stream semantics over one engine session.
//!
//! A [`StreamAdapter`] is both a [`Sink`] of input chunks and a [`Stream`] of
//! coded output. Every completion the engine reports travels through an
//! unbounded channel and is applied the next time the adapter is polled, so
//! chunk callbacks never run inside the call that submitted the chunk, and the
//! output order always matches the order the engine produced it in.

use crate::error::{Error, ErrorKind, Result};
use crate::throttle::{Mode, ThrottleTicket};
use exn::OptionExt;
use futures::channel::mpsc::{self, UnboundedReceiver};
use futures::future::poll_fn;
use futures::{Sink, SinkExt, Stream, StreamExt};
use lzstream_engine::{Chunk, Completion, Engine, Session};
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tracing::{debug, trace, warn};

/// Invoked once the engine has fully consumed the chunk it was submitted with.
pub type ChunkCallback = Box<dyn FnOnce() + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Active,
    Finished,
    Errored,
}

/// Stream wrapper around one engine session.
///
/// Chunks are written either through the [`Sink`] implementation, which keeps
/// one submission outstanding at a time, or directly with
/// [`submit`](Self::submit) and [`end`](Self::end). Output is read through the
/// [`Stream`] implementation; a failed stream yields its buffered output, then
/// exactly one error, then nothing.
///
/// Once the stream finishes or fails, the session is released and the
/// adapter's throttle registration (if any) is dropped. Chunk callbacks still
/// queued when the engine fails are dropped without being invoked.
pub struct StreamAdapter<E: Engine = Session> {
    engine: Option<E>,
    mode: Mode,
    ticket: Option<ThrottleTicket>,
    pending: VecDeque<Option<ChunkCallback>>,
    completions: UnboundedReceiver<Completion>,
    outgoing: VecDeque<Vec<u8>>,
    state: State,
    error: Option<Error>,
    error_kind: Option<ErrorKind>,
    ended: bool,
    deferred: bool,
    totals: (u64, u64),
}

impl<E: Engine> StreamAdapter<E> {
    /// Wrap `engine`, which must not have a completion handler of its own.
    /// `ticket` is the throttle registration of an asynchronous stream.
    pub fn new(mut engine: E, mode: Mode, ticket: Option<ThrottleTicket>) -> Self {
        let (sender, completions) = mpsc::unbounded();
        engine.set_completion_handler(Box::new(move |completion| {
            // The receiver only goes away together with the adapter.
            let _ = sender.unbounded_send(completion);
        }));
        Self {
            engine: Some(engine),
            mode,
            ticket,
            pending: VecDeque::new(),
            completions,
            outgoing: VecDeque::new(),
            state: State::Active,
            error: None,
            error_kind: None,
            ended: false,
            deferred: false,
            totals: (0, 0),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether the session has been released, after finishing or failing.
    pub fn is_released(&self) -> bool {
        self.engine.is_none()
    }

    /// Submit one chunk. `callback` runs once the engine has consumed it.
    ///
    /// An empty chunk ends the input, like [`end`](Self::end). Engine faults
    /// are never returned here: they terminate the stream and surface through
    /// its output. After termination the chunk and callback are dropped.
    pub fn submit<F>(&mut self, chunk: impl Into<Chunk>, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(chunk.into(), Some(Box::new(callback)));
    }

    /// Submit several buffers as a single chunk.
    pub fn submit_vectored<I, B, F>(&mut self, buffers: I, callback: F)
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
        F: FnOnce() + Send + 'static,
    {
        let data = buffers.into_iter().fold(Vec::new(), |mut data, buffer| {
            data.extend_from_slice(buffer.as_ref());
            data
        });
        self.enqueue(Chunk::Data(data), Some(Box::new(callback)));
    }

    /// End the input: the engine flushes and finishes the coded stream.
    pub fn end<F>(&mut self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Chunk::End, Some(Box::new(callback)));
    }

    pub fn memlimit_set(&mut self, limit: u64) -> Result<()> {
        self.session_mut()?.memlimit_set(limit)
    }

    pub fn memlimit(&self) -> Result<u64> {
        Ok(self.engine.as_ref().ok_or_raise(|| ErrorKind::Closed)?.memlimit())
    }

    /// Bytes consumed so far; final once the session is released.
    pub fn total_in(&self) -> u64 {
        self.engine.as_ref().map_or(self.totals.0, Engine::total_in)
    }

    /// Bytes produced so far; final once the session is released.
    pub fn total_out(&self) -> u64 {
        self.engine.as_ref().map_or(self.totals.1, Engine::total_out)
    }

    fn session_mut(&mut self) -> Result<&mut E> {
        self.engine.as_mut().ok_or_raise(|| ErrorKind::Closed)
    }

    fn enqueue(&mut self, chunk: Chunk, callback: Option<ChunkCallback>) {
        let Some(engine) = self.engine.as_mut() else {
            trace!("chunk submitted after termination, dropping");
            return;
        };
        let end = chunk.is_end();
        self.pending.push_back(callback);
        self.deferred = true;
        match engine.code(chunk, self.mode.is_asynchronous()) {
            Ok(()) => self.ended |= end,
            Err(err) => self.fail(err),
        }
    }

    fn poll_completions(&mut self, cx: &mut Context<'_>) {
        // Completions are never applied in the same turn as a submission.
        if std::mem::take(&mut self.deferred) {
            cx.waker().wake_by_ref();
            return;
        }
        loop {
            match self.completions.poll_next_unpin(cx) {
                Poll::Ready(Some(completion)) => self.apply(completion),
                Poll::Ready(None) => {
                    if !self.pending.is_empty() {
                        debug!(pending = self.pending.len(), "completion channel closed early");
                        self.fail(exn::Exn::from(ErrorKind::Internal));
                        self.pending.clear();
                    }
                    return;
                },
                Poll::Pending => return,
            }
        }
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::Output(block) => {
                if self.state != State::Errored {
                    self.outgoing.push_back(block);
                }
            },
            Completion::Processed(count) => self.acknowledge(count),
            Completion::Finished => self.complete(),
            Completion::Failed(err) => self.fail(err),
        }
    }

    fn acknowledge(&mut self, count: usize) {
        if self.state == State::Errored {
            return;
        }
        if count > self.pending.len() {
            debug!(count, pending = self.pending.len(), "engine acknowledged more chunks than submitted");
            self.fail(exn::Exn::from(ErrorKind::Internal));
            return;
        }
        for callback in self.pending.drain(..count).flatten() {
            callback();
        }
    }

    fn complete(&mut self) {
        if self.state != State::Active {
            return;
        }
        self.state = State::Finished;
        self.release();
        debug!(total_in = self.totals.0, total_out = self.totals.1, "stream finished");
    }

    fn fail(&mut self, err: Error) {
        if self.state != State::Active {
            trace!(error = %&*err, "error after termination ignored");
            return;
        }
        debug!(error = %&*err, dropped_callbacks = self.pending.len(), "stream failed");
        self.state = State::Errored;
        self.error_kind = Some((*err).clone());
        self.error = Some(err);
        self.pending.clear();
        self.release();
    }

    fn release(&mut self) {
        if let Some(engine) = self.engine.take() {
            self.totals = (engine.total_in(), engine.total_out());
            drop(engine);
            trace!(mode = %self.mode, "session released");
        }
        self.ticket = None;
    }

    /// Hand out the terminal error, at most once.
    fn take_error(&mut self) -> Option<Error> {
        self.error.take()
    }

    /// The terminal error for callers that observe it besides the output
    /// stream. Carries the kind only; the full error goes to the stream.
    fn terminal_error(&self) -> Error {
        exn::Exn::from(self.error_kind.clone().unwrap_or(ErrorKind::Internal))
    }

    fn poll_acknowledged(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.poll_completions(cx);
        if self.state == State::Errored {
            return Poll::Ready(Err(self.terminal_error()));
        }
        if self.pending.is_empty() {
            Poll::Ready(Ok(()))
        } else {
            Poll::Pending
        }
    }
}

impl<E: Engine + Unpin> StreamAdapter<E> {
    /// Wait until every submitted chunk has been acknowledged, running their
    /// callbacks.
    pub async fn acknowledged(&mut self) -> Result<()> {
        poll_fn(|cx| self.poll_acknowledged(cx)).await
    }

    /// Write one chunk and wait for it to be acknowledged.
    pub async fn write(&mut self, data: impl Into<Vec<u8>>) -> Result<()> {
        let result = SinkExt::send(self, data.into()).await;
        result.map_err(|err| self.take_error().unwrap_or(err))
    }

    /// End the input and collect all remaining output.
    pub async fn finish(&mut self) -> Result<Vec<u8>> {
        if let Err(err) = SinkExt::close(self).await {
            return Err(self.take_error().unwrap_or(err));
        }
        self.read_to_end().await
    }

    /// Collect output until the stream finishes or fails.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        while let Some(block) = self.next().await {
            output.extend_from_slice(&block?);
        }
        Ok(output)
    }
}

/// Empty items are ignored; use [`StreamAdapter::end`] or
/// [`SinkExt::close`] to end the input.
impl<E: Engine + Unpin> Sink<Vec<u8>> for StreamAdapter<E> {
    type Error = Error;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.get_mut().poll_acknowledged(cx)
    }

    fn start_send(self: Pin<&mut Self>, item: Vec<u8>) -> Result<()> {
        let this = self.get_mut();
        if this.state == State::Errored {
            return Err(this.terminal_error());
        }
        if !item.is_empty() {
            this.enqueue(Chunk::Data(item), None);
        }
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.get_mut().poll_acknowledged(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<()>> {
        let this = self.get_mut();
        ready!(this.poll_acknowledged(cx))?;
        if !this.ended {
            this.enqueue(Chunk::End, None);
        }
        this.poll_acknowledged(cx)
    }
}

impl<E: Engine + Unpin> Stream for StreamAdapter<E> {
    type Item = Result<Vec<u8>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        this.poll_completions(cx);
        if let Some(block) = this.outgoing.pop_front() {
            return Poll::Ready(Some(Ok(block)));
        }
        match this.state {
            State::Active => Poll::Pending,
            // The end-of-input acknowledgement trails the end of the stream.
            State::Finished if !this.pending.is_empty() => Poll::Pending,
            State::Finished => Poll::Ready(None),
            State::Errored => Poll::Ready(this.take_error().map(Err)),
        }
    }
}

impl<E: Engine> Drop for StreamAdapter<E> {
    fn drop(&mut self) {
        if let Some(err) = self.error.take() {
            warn!(error = %&*err, "stream dropped without its error being observed");
        }
    }
}
