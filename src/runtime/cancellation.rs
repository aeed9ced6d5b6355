//! `CancellationHandle`: returned by [`crate::runtime::Runtime::run_async`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use crate::context::ExecutionContext;

/// The completion signal shared between a spawned `run_async` task and the
/// [`CancellationHandle`] returned to the caller.
#[derive(Default)]
pub(crate) struct Completion {
    finished: AtomicBool,
    notify: Notify,
}

impl Completion {
    pub(crate) fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

/// A handle onto an asynchronously-running effect, independent of whether its result is still
/// wanted.
pub struct CancellationHandle {
    ctx: Arc<ExecutionContext>,
    completion: Arc<Completion>,
}

impl std::fmt::Debug for CancellationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationHandle")
            .field("cancelled", &self.ctx.is_cancelled())
            .field("finished", &self.completion.finished.load(Ordering::SeqCst))
            .finish()
    }
}

impl CancellationHandle {
    pub(crate) fn new(ctx: Arc<ExecutionContext>, completion: Arc<Completion>) -> Self {
        CancellationHandle { ctx, completion }
    }

    /// Idempotent: flips the underlying context's cancelled flag, signalling the running task's
    /// interruption primitive.
    pub fn cancel(&self) {
        self.ctx.cancel();
    }

    /// Whether [`CancellationHandle::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.ctx.is_cancelled()
    }

    /// Block until the task completes, by whichever path (success, error, or cancellation).
    pub async fn join(&self) {
        loop {
            if self.completion.finished.load(Ordering::SeqCst) {
                return;
            }
            let notified = self.completion.notify.notified();
            if self.completion.finished.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }

    /// Block until the task completes or `timeout` elapses, whichever is first.
    ///
    /// Returns `true` if the task completed within the window, `false` on timeout.
    pub async fn join_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.join()).await.is_ok()
    }
}
