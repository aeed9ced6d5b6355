//! `Fiber`: a handle onto a concurrently-running effect.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::context::ExecutionContext;
use crate::effect::node::AnyBox;
use crate::effect::Effect;
use crate::error::AnyError;

static NEXT_FIBER_ID: AtomicU64 = AtomicU64::new(1);

/// A stable identifier assigned at fork time, unique for the process's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FiberId(u64);

impl FiberId {
    fn next() -> Self {
        FiberId(NEXT_FIBER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fiber-{}", self.0)
    }
}

/// Where a fiber's underlying task deposits its outcome, and where joiners wait on it.
pub(crate) struct Completion {
    outcome: Mutex<Option<Result<AnyBox, AnyError>>>,
    notify: Notify,
}

impl Completion {
    fn new() -> Arc<Self> {
        Arc::new(Completion {
            outcome: Mutex::new(None),
            notify: Notify::new(),
        })
    }

    /// Called exactly once by the task that owns this fiber, when its trampoline terminates.
    pub(crate) fn fulfil(&self, outcome: Result<AnyBox, AnyError>) {
        *self.outcome.lock().unwrap() = Some(outcome);
        self.notify.notify_waiters();
    }

    fn is_ready(&self) -> bool {
        self.outcome.lock().unwrap().is_some()
    }

    /// Take the outcome, if present. Join is single-consumer: a second call observes `None` and
    /// the caller reports a host error rather than blocking forever, since there is no way to
    /// reproduce a non-`Clone` `AnyBox`/`AnyError` payload for a second reader.
    fn take(&self) -> Option<Result<AnyBox, AnyError>> {
        self.outcome.lock().unwrap().take()
    }
}

/// A handle onto an effect running on its own executor task.
///
/// Joining re-raises whatever outcome the task produced, widened to [`AnyError`] because the
/// fork that created this fiber erased the inner effect's concrete error type.
#[derive(Clone)]
pub struct Fiber {
    id: FiberId,
    ctx: Arc<ExecutionContext>,
    interrupted: Arc<AtomicBool>,
    completion: Arc<Completion>,
}

impl fmt::Debug for Fiber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber")
            .field("id", &self.id)
            .field("completed", &self.completion.is_ready())
            .field("interrupted", &self.interrupted.load(Ordering::SeqCst))
            .finish()
    }
}

impl Fiber {
    /// Assemble a fiber handle around a freshly spawned task's context, returning the handle
    /// alongside the [`Completion`] the spawned task will fulfil.
    ///
    /// Only [`crate::runtime`] constructs these, at the moment a `Fork` node is evaluated.
    pub(crate) fn new(ctx: Arc<ExecutionContext>) -> (Fiber, Arc<Completion>) {
        let completion = Completion::new();
        let fiber = Fiber {
            id: FiberId::next(),
            ctx,
            interrupted: Arc::new(AtomicBool::new(false)),
            completion: completion.clone(),
        };
        (fiber, completion)
    }

    /// The identifier assigned at fork time.
    pub fn id(&self) -> FiberId {
        self.id
    }

    /// Block (cooperatively) until the fiber's completion slot is populated, or `joiner_ctx`
    /// (the context of whoever is doing the joining, *not* this fiber's own context) observes
    /// cancellation, whichever happens first.
    pub(crate) async fn join_erased(
        &self,
        joiner_ctx: &Arc<ExecutionContext>,
    ) -> Result<AnyBox, AnyError> {
        loop {
            if self.completion.is_ready() {
                return match self.completion.take() {
                    Some(outcome) => outcome,
                    None => Err(AnyError::HostError(format!(
                        "{} was already joined once; a fiber's outcome is single-consumer",
                        self.id
                    ))),
                };
            }
            let notified = self.completion.notify.notified();
            tokio::select! {
                _ = notified => {}
                _ = joiner_ctx.wait_cancelled() => return Err(AnyError::Cancelled),
            }
        }
    }

    /// Build an effect that blocks until this fiber completes and yields its value as `A` —
    /// the concrete type only the caller still remembers, since forking already widened this
    /// handle's own error channel to [`AnyError`]. Downcasts the fiber's erased
    /// outcome back to `A` at that boundary, the same technique
    /// [`crate::generator::GeneratorContext::yield_effect`] uses to reenter the trampoline on a
    /// concrete type.
    pub fn join<A: Send + 'static>(&self) -> Effect<A, AnyError> {
        let fiber = self.clone();
        Effect::suspend_erased(move |ctx| {
            Box::pin(async move {
                match fiber.join_erased(&ctx).await {
                    Ok(boxed) => match boxed.downcast::<A>() {
                        Ok(value) => Ok(Box::new(*value) as AnyBox),
                        Err(_) => Err(AnyError::HostError(
                            "fiber join: requested type does not match the forked effect's success type"
                                .to_string(),
                        )),
                    },
                    Err(e) => Err(e),
                }
            })
        })
    }

    /// Atomically flip the interrupted flag and cancel the fiber's own context; idempotent.
    pub fn interrupt(&self) {
        if self
            .interrupted
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.ctx.cancel();
        }
    }

    /// Whether [`Fiber::interrupt`] has been called on this handle.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}
