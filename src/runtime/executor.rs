//! The task-spawning abstraction behind `Fork`.
//!
//! The trampoline itself never decides how a forked task actually runs; it hands a boxed future
//! to an [`Executor`]. [`TokioExecutor`] is the only implementation shipped — this crate's
//! dependency stack is tokio end to end — but the seam exists so a `Runtime` built with a
//! different executor is a supported extension point rather than a rewrite.

use std::sync::{Arc, OnceLock};

use crate::context::ExecutionContext;
use crate::effect::node::{AnyBox, BoxFuture, Node};
use crate::error::AnyError;
use crate::fiber::Fiber;

/// Something that can run a boxed, `'static` future to completion without blocking the caller.
pub trait Executor: Send + Sync {
    /// Spawn `future` to run independently of the caller.
    fn spawn(&self, future: BoxFuture<'static, ()>);
}

/// The default executor: every spawn becomes a `tokio::spawn`.
#[derive(Debug, Default)]
pub struct TokioExecutor;

impl Executor for TokioExecutor {
    fn spawn(&self, future: BoxFuture<'static, ()>) {
        tokio::spawn(future);
    }
}

static DEFAULT_EXECUTOR: OnceLock<Arc<dyn Executor>> = OnceLock::new();

/// The process-wide default executor, lazily constructed as a [`TokioExecutor`].
pub(crate) fn default_executor() -> Arc<dyn Executor> {
    DEFAULT_EXECUTOR
        .get_or_init(|| Arc::new(TokioExecutor) as Arc<dyn Executor>)
        .clone()
}

/// Spawn `node` on `executor` under a fresh child of `parent_ctx`, returning a [`Fiber`] handle
/// immediately — forking itself does not suspend the caller; the parent proceeds.
pub(crate) fn execute_fork_on(
    executor: &Arc<dyn Executor>,
    node: Node,
    parent_ctx: &Arc<ExecutionContext>,
) -> Fiber {
    let child_ctx = parent_ctx.child();
    let (fiber, completion) = Fiber::new(child_ctx.clone());
    let fiber_id = fiber.id();
    let task = async move {
        let outcome: Result<AnyBox, AnyError> =
            crate::effect::interpreter::run_node(node, child_ctx).await;
        completion.fulfil(outcome);
    };
    #[cfg(feature = "tracing")]
    let task = {
        use tracing::Instrument;
        task.instrument(tracing::debug_span!("fiber", id = %fiber_id))
    };
    #[cfg(not(feature = "tracing"))]
    let _ = fiber_id;
    executor.spawn(Box::pin(task));
    fiber
}
