//! Ownership of long-lived listener tasks
//!
//! Subscriptions live as long as the screen-level object that started them.
//! Each such object owns a `TaskScope`; dropping it aborts the listener
//! tasks, which drops their subscriptions and unregisters them from the
//! backend.

use std::future::Future;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub struct TaskScope {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        let mut handles = self.handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Tasks that have not finished yet
    pub fn active(&self) -> usize {
        self.handles
            .lock()
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    pub fn shutdown(&self) {
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.shutdown();
    }
}
