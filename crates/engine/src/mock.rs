//! Scripted engine for testing stream adapters.

use crate::error::{ErrorKind, Result};
use crate::session::{Chunk, Completion, CompletionHandler, Engine};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Scripted [`Engine`] for testing.
///
/// Each call to [`code`](Engine::code) replays the next scripted batch of
/// completions through the handler. Once the script runs out, chunks are
/// echoed back unchanged: data as [`Completion::Output`], the end of input as
/// [`Completion::Finished`], each followed by `Processed(1)`.
///
/// # Examples
///
/// ```
/// use lzstream_engine::{Chunk, Completion, Engine, MockEngine};
///
/// let mut engine = MockEngine::new().respond([Completion::Output(b"first".to_vec())]);
/// let submitted = engine.submitted();
/// engine.set_completion_handler(Box::new(|_completion| {}));
/// engine.code(Chunk::Data(b"abc".to_vec()), false).unwrap();
/// assert_eq!(submitted.lock().unwrap().len(), 1);
/// ```
#[derive(Default)]
pub struct MockEngine {
    handler: Option<CompletionHandler>,
    script: VecDeque<Vec<Completion>>,
    submitted: Arc<Mutex<Vec<(Chunk, bool)>>>,
    fault: Option<ErrorKind>,
    memlimit: u64,
    total_in: u64,
    total_out: u64,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            memlimit: u64::MAX,
            ..Self::default()
        }
    }

    /// Queue the completions reported for the next unscripted `code` call.
    #[must_use]
    pub fn respond(mut self, completions: impl IntoIterator<Item = Completion>) -> Self {
        self.script.push_back(completions.into_iter().collect());
        self
    }

    /// Make every `code` call raise `kind` instead of reporting anything.
    #[must_use]
    pub fn fault_on_code(mut self, kind: ErrorKind) -> Self {
        self.fault = Some(kind);
        self
    }

    /// Every chunk submitted so far, with the asynchronous flag it came with.
    pub fn submitted(&self) -> Arc<Mutex<Vec<(Chunk, bool)>>> {
        Arc::clone(&self.submitted)
    }

    fn emit(&mut self, completion: Completion) {
        if let Completion::Output(block) = &completion {
            self.total_out += block.len() as u64;
        }
        if let Some(handler) = self.handler.as_mut() {
            handler(completion);
        }
    }
}

impl Engine for MockEngine {
    fn set_completion_handler(&mut self, handler: CompletionHandler) {
        self.handler = Some(handler);
    }

    fn code(&mut self, chunk: Chunk, asynchronous: bool) -> Result<()> {
        if let Some(kind) = self.fault.clone() {
            exn::bail!(kind);
        }
        if self.handler.is_none() {
            exn::bail!(ErrorKind::NoHandler);
        }
        self.total_in += chunk.as_bytes().len() as u64;
        self.submitted.lock().unwrap_or_else(PoisonError::into_inner).push((chunk.clone(), asynchronous));

        match self.script.pop_front() {
            Some(batch) => batch.into_iter().for_each(|completion| self.emit(completion)),
            None if chunk.is_end() => {
                self.emit(Completion::Finished);
                self.emit(Completion::Processed(1));
            },
            None => {
                self.emit(Completion::Output(chunk.as_bytes().to_vec()));
                self.emit(Completion::Processed(1));
            },
        }
        Ok(())
    }

    fn memlimit_set(&mut self, limit: u64) -> Result<()> {
        self.memlimit = limit;
        Ok(())
    }

    fn memlimit(&self) -> u64 {
        self.memlimit
    }

    fn total_in(&self) -> u64 {
        self.total_in
    }

    fn total_out(&self) -> u64 {
        self.total_out
    }
}
