use std::future::Future;

use futures::channel::oneshot;
use futures::future::{AbortHandle, Abortable};

use crate::error::{LoadError, Result};

/// An asset load running as its own task. The frame loop polls it without
/// blocking; the result is handed out exactly once.
pub struct PendingLoad<T> {
    label: String,
    receiver: oneshot::Receiver<Result<T>>,
    abort: AbortHandle,
    cancelled: bool,
    settled: bool,
}

impl<T: 'static> PendingLoad<T> {
    /// Wrap `load`. The returned task must be spawned (with `spawn_local` in
    /// the browser); dropping it unspawned makes the load report `Cancelled`.
    pub fn new<F>(label: impl Into<String>, load: F) -> (Self, impl Future<Output = ()>)
    where
        F: Future<Output = Result<T>> + 'static,
    {
        let label = label.into();
        let (sender, receiver) = oneshot::channel();
        let (abort, registration) = AbortHandle::new_pair();

        let task_label = label.clone();
        let task = async move {
            match Abortable::new(load, registration).await {
                Ok(result) => {
                    // Receiver gone means nobody is waiting any more
                    let _ = sender.send(result);
                }
                Err(_aborted) => log::info!("{task_label} load cancelled"),
            }
        };

        let pending = Self {
            label,
            receiver,
            abort,
            cancelled: false,
            settled: false,
        };
        (pending, task)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the result (or cancellation) has already been observed.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// `Some` once, when the load has finished; `None` while it is running,
    /// after it was cancelled, and on every call after the first `Some`.
    pub fn poll_ready(&mut self) -> Option<Result<T>> {
        if self.settled {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(Some(result)) => {
                self.settled = true;
                Some(result)
            }
            Ok(None) => None,
            Err(oneshot::Canceled) => {
                self.settled = true;
                if self.cancelled {
                    None
                } else {
                    Some(Err(LoadError::Cancelled(self.label.clone())))
                }
            }
        }
    }

    /// Stop the load. Its result, if any arrives later, is discarded.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.abort.abort();
    }
}
