//! Per-session worker thread for asynchronous coding.

use crate::error::{ErrorKind, Result};
use crate::session::{Chunk, Completion, SharedCodec, SharedHandler, dispatch};
use exn::ResultExt;
use std::iter;
use std::sync::PoisonError;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

/// Handle to a session's worker thread. Dropping it closes the input queue,
/// which stops the thread once it has finished its current batch.
pub(crate) struct Worker {
    sender: Sender<Chunk>,
}

impl Worker {
    pub(crate) fn spawn(codec: SharedCodec, handler: SharedHandler) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();
        thread::Builder::new()
            .name("lzstream-worker".to_string())
            .spawn(move || run(&codec, &handler, &receiver))
            .or_raise(|| ErrorKind::Internal)?;
        tracing::debug!("worker started");
        Ok(Self { sender })
    }

    pub(crate) fn send(&self, chunk: Chunk) -> Result<()> {
        self.sender.send(chunk).or_raise(|| ErrorKind::Closed)
    }
}

/// Code chunks as they arrive. Everything queued at the time a batch starts
/// is coded together and acknowledged with a single processed count.
fn run(codec: &SharedCodec, handler: &SharedHandler, receiver: &Receiver<Chunk>) {
    let mut emit = |completion: Completion| dispatch(handler, completion);
    while let Ok(first) = receiver.recv() {
        let mut processed = 0;
        let mut ended = false;
        for chunk in iter::once(first).chain(receiver.try_iter()) {
            ended |= chunk.is_end();
            codec
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .feed(chunk.as_bytes(), chunk.is_end(), &mut emit);
            processed += 1;
        }
        emit(Completion::Processed(processed));
        if ended {
            break;
        }
    }
    tracing::debug!("worker stopped");
}
