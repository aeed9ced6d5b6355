//! `ExecutionContext`: per-run cancellation state and the resolved capability handler.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use crate::capability::CapabilityHandler;
use crate::runtime::executor::Executor;

/// An immutable tree node carrying cancellation state and the currently-active capability
/// handler.
///
/// `cancel()` is the only mutation: it is idempotent (a `compare_exchange` on `cancelled`) and
/// propagates strictly downward to every live child, never upward — an ancestor never becomes
/// cancelled because of a child. Children are held `Weak` so a context does not keep its forked
/// descendants alive past their own lifetime — the scope/fiber that owns a child context is
/// responsible for keeping it alive.
pub struct ExecutionContext {
    parent: Option<Arc<ExecutionContext>>,
    cancelled: AtomicBool,
    children: Mutex<Vec<Weak<ExecutionContext>>>,
    notify: tokio::sync::Notify,
    handler: Option<Arc<dyn CapabilityHandler>>,
    executor: Option<Arc<dyn Executor>>,
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("cancelled", &self.cancelled.load(Ordering::SeqCst))
            .field("has_handler", &self.handler.is_some())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

static ROOT: OnceLock<Arc<ExecutionContext>> = OnceLock::new();

impl ExecutionContext {
    fn new(
        parent: Option<Arc<ExecutionContext>>,
        handler: Option<Arc<dyn CapabilityHandler>>,
        executor: Option<Arc<dyn Executor>>,
    ) -> Arc<Self> {
        Arc::new(ExecutionContext {
            parent,
            cancelled: AtomicBool::new(false),
            children: Mutex::new(Vec::new()),
            notify: tokio::sync::Notify::new(),
            handler,
            executor,
        })
    }

    /// The process-wide root context.
    ///
    /// Lazily initialised; every [`crate::runtime::Runtime::run`] call derives a fresh child of
    /// this root rather than mutating it, so one cancelled run can never affect another.
    pub fn root() -> Arc<ExecutionContext> {
        ROOT.get_or_init(|| ExecutionContext::new(None, None, None)).clone()
    }

    /// Derive a child context, inheriting the parent's handler and executor.
    pub fn child(self: &Arc<Self>) -> Arc<ExecutionContext> {
        let child = ExecutionContext::new(Some(self.clone()), self.handler.clone(), self.executor.clone());
        self.children.lock().unwrap().push(Arc::downgrade(&child));
        child
    }

    /// Derive a context sharing this context's parent but with `handler` installed, shadowing
    /// whatever handler this context had.
    pub fn with_handler(
        self: &Arc<Self>,
        handler: Arc<dyn CapabilityHandler>,
    ) -> Arc<ExecutionContext> {
        let derived = ExecutionContext::new(Some(self.clone()), Some(handler), self.executor.clone());
        self.children.lock().unwrap().push(Arc::downgrade(&derived));
        derived
    }

    /// Derive a child context with `executor` installed, so every `Fork` node reached from this
    /// point spawns onto it instead of the process-wide default. Used by
    /// [`crate::runtime::Runtime::run`] and [`crate::runtime::Runtime::run_async`] to bind a
    /// non-default [`Executor`] to the whole run, not just its top-level task.
    pub(crate) fn child_with_executor(self: &Arc<Self>, executor: Arc<dyn Executor>) -> Arc<ExecutionContext> {
        let child = ExecutionContext::new(Some(self.clone()), self.handler.clone(), Some(executor));
        self.children.lock().unwrap().push(Arc::downgrade(&child));
        child
    }

    /// A context is cancelled iff its own flag is set or any ancestor's is.
    pub fn is_cancelled(&self) -> bool {
        if self.cancelled.load(Ordering::SeqCst) {
            return true;
        }
        match &self.parent {
            Some(parent) => parent.is_cancelled(),
            None => false,
        }
    }

    /// Idempotent; transitively cancels every currently-live descendant.
    pub fn cancel(self: &Arc<Self>) {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.notify.notify_waiters();
        let children = self.children.lock().unwrap();
        for weak in children.iter() {
            if let Some(child) = weak.upgrade() {
                child.cancel();
            }
        }
    }

    /// The handler resolved by walking up the parent chain, or `None` if no ancestor installed
    /// one — the trampoline turns that into [`AnyError::HandlerMissing`].
    pub(crate) fn resolve_handler(&self) -> Option<Arc<dyn CapabilityHandler>> {
        self.handler.clone()
    }

    /// The executor bound to this context, if any was installed by
    /// [`ExecutionContext::child_with_executor`] on this context or an ancestor. `None` means the
    /// caller should fall back to the process-wide default executor.
    pub(crate) fn resolve_executor(&self) -> Option<Arc<dyn Executor>> {
        self.executor.clone()
    }

    /// Await until this context is cancelled. Used by `Fiber::join` and the scope-exit wait so
    /// those suspension points wake promptly instead of only at the next polling tick.
    pub(crate) async fn wait_cancelled(&self) {
        loop {
            if self.is_cancelled() {
                return;
            }
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Build a fresh root-derived context with both `handler` and `executor` installed, used by
/// [`crate::runtime::Runtime::run_with_handler`] when the runtime was built with a non-default
/// executor.
pub(crate) fn root_with_handler_and_executor(
    handler: Arc<dyn CapabilityHandler>,
    executor: Arc<dyn Executor>,
) -> Arc<ExecutionContext> {
    ExecutionContext::root()
        .with_handler(handler)
        .child_with_executor(executor)
}
