//! The runtime façade.
//!
//! [`Runtime`] is the one place a user hands an [`Effect`] to an executor and gets a concrete
//! `Result<A, E>` (or a [`CancellationHandle`]) back. Everything below it — the trampoline, the
//! executor trait, fibers, scopes — stays inside the crate; this module is the only thing most
//! callers need to import alongside [`crate::effect`] and [`crate::capability`].

pub mod cancellation;
pub mod executor;

use std::sync::Arc;

pub use cancellation::CancellationHandle;
pub use executor::{Executor, TokioExecutor};

use cancellation::Completion;

use crate::capability::CapabilityHandler;
use crate::context::ExecutionContext;
use crate::effect::Effect;
use crate::error::AnyError;

/// Recover a concrete `E` from the erased channel the interpreter actually produces.
///
/// `AnyError::Domain` downcasts directly; every structural variant (`Cancelled`,
/// `HandlerMissing`, `HandlerFailure`, `HostError`) is handed to `E::from` instead — these
/// appear under the caller's own error type because callers cannot statically name handler
/// errors.
fn finish<A, E>(outcome: Result<crate::effect::node::AnyBox, AnyError>) -> Result<A, E>
where
    A: Send + 'static,
    E: From<AnyError> + Send + 'static,
{
    match outcome {
        Ok(boxed) => Ok(*boxed
            .downcast::<A>()
            .unwrap_or_else(|_| panic!("effect value type mismatch: interpreter invariant violated"))),
        Err(any) => match any.downcast::<E>() {
            Ok(e) => Err(e),
            Err(any) => Err(E::from(any)),
        },
    }
}

/// Holds an executor and drives [`Effect`]s to completion on it.
///
/// The default [`Runtime::new`] uses [`TokioExecutor`]; [`Runtime::with_executor`] accepts any
/// other [`Executor`] implementation, so the core consumes an abstract executor rather than
/// owning one concretely.
pub struct Runtime {
    executor: Arc<dyn Executor>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime").finish_non_exhaustive()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new()
    }
}

impl Runtime {
    /// A runtime backed by [`TokioExecutor`].
    pub fn new() -> Self {
        Runtime {
            executor: Arc::new(TokioExecutor),
        }
    }

    /// A runtime backed by a caller-supplied [`Executor`].
    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Runtime { executor }
    }

    /// The executor this runtime spawns forked fibers and `run_async` tasks on.
    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    /// Run `effect` to completion on the current task, synchronously from the caller's point of
    /// view (it still `.await`s internally — "synchronous" here means no fiber or callback is
    /// involved, not that it blocks a thread).
    pub async fn run<A, E>(&self, effect: Effect<A, E>) -> Result<A, E>
    where
        A: Send + 'static,
        E: From<AnyError> + Send + 'static,
    {
        let ctx = ExecutionContext::root().child_with_executor(self.executor.clone());
        let outcome = crate::effect::interpreter::run_node(effect.into_node(), ctx).await;
        finish(outcome)
    }

    /// Like [`Runtime::run`], but with `handler` installed in a child of the root context before
    /// `effect` evaluates, so every `PerformCapability` node it reaches resolves against
    /// `handler`, no matter how deeply nested in `flat_map` or `scoped` the performing effect is.
    pub async fn run_with_handler<A, E, H>(&self, effect: Effect<A, E>, handler: H) -> Result<A, E>
    where
        A: Send + 'static,
        E: From<AnyError> + Send + 'static,
        H: CapabilityHandler + 'static,
    {
        let ctx = crate::context::root_with_handler_and_executor(
            Arc::new(handler),
            self.executor.clone(),
        );
        let outcome = crate::effect::interpreter::run_node(effect.into_node(), ctx).await;
        finish(outcome)
    }

    /// Spawn `effect` on this runtime's executor; `on_ok`/`on_err` fire on completion unless the
    /// returned handle was cancelled first, in which case neither fires but the spawned task's
    /// own future still resolves so [`CancellationHandle::join`] returns.
    pub fn run_async<A, E, OnOk, OnErr>(
        &self,
        effect: Effect<A, E>,
        on_ok: OnOk,
        on_err: OnErr,
    ) -> CancellationHandle
    where
        A: Send + 'static,
        E: From<AnyError> + Send + 'static,
        OnOk: FnOnce(A) + Send + 'static,
        OnErr: FnOnce(E) + Send + 'static,
    {
        let ctx = ExecutionContext::root().child_with_executor(self.executor.clone());
        let completion = Arc::new(Completion::default());
        let handle = CancellationHandle::new(ctx.clone(), completion.clone());

        self.executor.spawn(Box::pin(async move {
            let outcome = crate::effect::interpreter::run_node(effect.into_node(), ctx.clone()).await;
            if !ctx.is_cancelled() {
                match finish::<A, E>(outcome) {
                    Ok(a) => on_ok(a),
                    Err(e) => on_err(e),
                }
            }
            completion.mark_finished();
        }));

        handle
    }

    /// Spawn `effect` directly onto this runtime's executor under a fresh child of `parent_ctx`,
    /// without going through a `Fork` node. `Effect::fork` on an effect already running inside
    /// this runtime reaches the same codepath internally; this entry point exists for callers
    /// who hold a [`Runtime`] and an [`ExecutionContext`] but no enclosing trampoline, e.g. to
    /// seed the first fiber of a program by hand.
    pub fn execute_fork<A, E>(
        &self,
        effect: Effect<A, E>,
        parent_ctx: &Arc<ExecutionContext>,
    ) -> crate::fiber::Fiber
    where
        A: Send + 'static,
        E: Send + 'static,
    {
        executor::execute_fork_on(&self.executor, effect.into_node(), parent_ctx)
    }
}
