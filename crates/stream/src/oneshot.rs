use crate::error::{Error, Result};
use futures::future::BoxFuture;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

/// Callback run with the outcome of a [`OneShot`].
pub type FinishCallback = Box<dyn FnOnce(std::result::Result<&[u8], &Error>) + Send>;
/// Callback run with the fraction of a [`OneShot`] that is done.
pub type ProgressCallback = Box<dyn FnMut(f64) + Send>;

/// A whole-buffer coding job: write everything, end the input, collect all
/// output.
///
/// Await it, [`wait`](Self::wait) for it, or attach callbacks with
/// [`on_finish`](Self::on_finish) before doing either.
#[must_use = "futures do nothing unless polled"]
pub struct OneShot {
    future: BoxFuture<'static, Result<Vec<u8>>>,
    callbacks: Vec<FinishCallback>,
    progress: Vec<ProgressCallback>,
    started: bool,
}

impl OneShot {
    pub(crate) fn new(future: impl Future<Output = Result<Vec<u8>>> + Send + 'static) -> Self {
        Self {
            future: Box::pin(future),
            callbacks: Vec::new(),
            progress: Vec::new(),
            started: false,
        }
    }

    /// Run `callback` with `0.0` when the job starts and `1.0` when it
    /// completes successfully, before any [`on_finish`](Self::on_finish)
    /// callback.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(f64) + Send + 'static,
    {
        self.progress.push(Box::new(callback));
        self
    }

    /// Run `callback` with the output, or the error, once the job completes.
    pub fn on_finish<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(std::result::Result<&[u8], &Error>) + Send + 'static,
    {
        self.callbacks.push(Box::new(callback));
        self
    }

    /// Block the current thread until the job completes.
    pub fn wait(self) -> Result<Vec<u8>> {
        futures::executor::block_on(self)
    }
}

impl Future for OneShot {
    type Output = Result<Vec<u8>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if !this.started {
            this.started = true;
            this.progress.iter_mut().for_each(|callback| callback(0.0));
        }
        let result = ready!(this.future.as_mut().poll(cx));
        if result.is_ok() {
            this.progress.iter_mut().for_each(|callback| callback(1.0));
        }
        for callback in this.callbacks.drain(..) {
            callback(result.as_ref().map(Vec::as_slice));
        }
        Poll::Ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_callbacks_see_output() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let output = OneShot::new(async { Ok(b"done".to_vec()) })
            .on_finish(move |result| sink.lock().unwrap().push(result.unwrap().to_vec()))
            .await
            .unwrap();
        assert_eq!(output, b"done");
        assert_eq!(*seen.lock().unwrap(), vec![b"done".to_vec()]);
    }

    #[tokio::test]
    async fn test_progress_brackets_the_job() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let (progress, finish) = (Arc::clone(&events), Arc::clone(&events));
        OneShot::new(async { Ok(Vec::new()) })
            .on_finish(move |_| finish.lock().unwrap().push(-1.0))
            .on_progress(move |fraction| progress.lock().unwrap().push(fraction))
            .await
            .unwrap();
        assert_eq!(*events.lock().unwrap(), vec![0.0, 1.0, -1.0]);
    }

    #[test]
    fn test_failed_job_reports_no_completion_progress() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let result = OneShot::new(async { Err(exn::Exn::from(ErrorKind::InvalidData)) })
            .on_progress(move |fraction| sink.lock().unwrap().push(fraction))
            .wait();
        assert!(result.is_err());
        assert_eq!(*seen.lock().unwrap(), vec![0.0]);
    }

    #[test]
    fn test_callbacks_see_error() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let err = OneShot::new(async { Err(exn::Exn::from(ErrorKind::Truncated)) })
            .on_finish(move |result| *sink.lock().unwrap() = Some((**result.unwrap_err()).clone()))
            .wait()
            .unwrap_err();
        assert_eq!(*err, ErrorKind::Truncated);
        assert_eq!(*seen.lock().unwrap(), Some(ErrorKind::Truncated));
    }
}
