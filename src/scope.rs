//! `EffectScope`: the lexical container for forked fibers.
//!
//! A tree of scopes that cancels its children on exit and waits for them to actually stop
//! before the scope itself is considered closed. Every fiber a scope tracks is already
//! `'static` because forking always produces an owned [`crate::fiber::Fiber`], so no unsafe
//! lifetime extension is needed to hold them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::context::ExecutionContext;
use crate::error::AnyError;
use crate::fiber::Fiber;

/// A distinguished structural error returned by [`EffectScope::fork`] once the scope has been
/// cancelled: no caller can add a new child to a scope that is already tearing down.
pub(crate) fn scope_cancelled_error() -> AnyError {
    AnyError::HostError("fork attempted on a cancelled scope".to_string())
}

/// The lexical container a `Scoped` body runs inside.
///
/// Tracks every fiber forked through it so the scope-exit protocol can wait for all of them and
/// guarantee none survives past the `Scoped` node that created it.
pub struct EffectScope {
    ctx: Arc<ExecutionContext>,
    children: Mutex<Vec<Fiber>>,
    cancelled: AtomicBool,
}

impl std::fmt::Debug for EffectScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectScope")
            .field("cancelled", &self.cancelled.load(Ordering::SeqCst))
            .field("children", &self.children.lock().unwrap().len())
            .finish()
    }
}

impl EffectScope {
    /// Build a scope bound to a freshly derived child context. Only the interpreter's
    /// `Scoped` handling constructs one.
    pub(crate) fn new(parent_ctx: &Arc<ExecutionContext>) -> Arc<EffectScope> {
        Arc::new(EffectScope {
            ctx: parent_ctx.child(),
            children: Mutex::new(Vec::new()),
            cancelled: AtomicBool::new(false),
        })
    }

    /// The context a `Scoped` body's own effect runs under.
    pub(crate) fn context(&self) -> &Arc<ExecutionContext> {
        &self.ctx
    }

    /// Record a fiber this scope is now responsible for. Called by the interpreter immediately
    /// after it spawns a fork whose parent effect is this scope's body.
    pub(crate) fn track(&self, fiber: Fiber) -> Result<(), AnyError> {
        if self.is_cancelled() {
            return Err(scope_cancelled_error());
        }
        self.children.lock().unwrap().push(fiber);
        Ok(())
    }

    /// Idempotent; interrupts every recorded child and marks the scope cancelled. Returns once
    /// the interrupt signal has been delivered — it does not wait for children to actually stop;
    /// the scope-exit protocol does that separately.
    pub fn cancel_all(&self) {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        self.ctx.cancel();
        for child in self.children.lock().unwrap().iter() {
            child.interrupt();
        }
    }

    /// Whether [`EffectScope::cancel_all`] has run.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst) || self.ctx.is_cancelled()
    }

    /// Wait for every currently-tracked child to terminate, widening each outcome to
    /// [`AnyError`]. Runs the joins concurrently — siblings have no ordering guarantee with
    /// respect to each other. Used by the scope-exit protocol; never exposed to users.
    pub(crate) async fn join_all(&self) -> Vec<Result<(), AnyError>> {
        let children: Vec<Fiber> = self.children.lock().unwrap().clone();
        let joins = children.iter().map(|child| child.join_erased(&self.ctx));
        futures::future::join_all(joins)
            .await
            .into_iter()
            .map(|outcome| outcome.map(|_| ()))
            .collect()
    }
}
