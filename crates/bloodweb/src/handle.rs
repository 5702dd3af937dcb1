//! Owned background worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bloodweb_core::BoardObserver;

use crate::{PointerDriver, ScreenCapture, Worker, WorkerError};

/// A [`Worker`] running on its own thread.
///
/// Dropping the handle stops the worker and waits for it.
pub struct WorkerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<Result<(), WorkerError>>>,
}

impl WorkerHandle {
    pub fn start<C, P, O>(mut worker: Worker<C, P, O>) -> Result<Self, WorkerError>
    where
        C: ScreenCapture + Send + 'static,
        P: PointerDriver + Send + 'static,
        O: BoardObserver + Send + 'static,
    {
        let stop = worker.stop_flag();
        stop.store(false, Ordering::Relaxed);
        let thread = thread::Builder::new()
            .name("bloodweb-worker".into())
            .spawn(move || worker.run())
            .map_err(WorkerError::Spawn)?;
        log::info!("worker started");
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// `false` once the worker returned, on its own or after a stop.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Raise the stop flag without waiting.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Stop at the next round boundary and return how the worker ended.
    pub fn stop(mut self) -> Result<(), WorkerError> {
        self.request_stop();
        let result = match self.thread.take() {
            Some(t) => t.join().unwrap_or(Err(WorkerError::Panicked)),
            None => Ok(()),
        };
        log::info!("worker stopped");
        result
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if let Some(t) = self.thread.take() {
            self.request_stop();
            let _ = t.join();
        }
    }
}
