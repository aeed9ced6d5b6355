//! The public, statically-typed effect description.
//!
//! `Effect<A, E>` is a thin, phantom-typed wrapper around the erased [`Node`] tree. Every
//! combinator here allocates O(1) new nodes and boxes/downcasts at its boundary with the erased
//! layer underneath — this is the one place in the crate where `Box<dyn Any>` type mismatches
//! would be a programmer error rather than a possible user input, so boundary downcasts use
//! `expect` with a message naming the invariant rather than a recoverable `Result`.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::effect::node::{AnyBox, BoxFuture, FlatMapFn, FoldErrFn, MapErrFn, Node, SuspendFn};
use crate::error::AnyError;
use crate::fiber::Fiber;
use crate::scope::EffectScope;

/// A lazily-evaluated description of a computation that produces `A` or fails with `E`.
///
/// Values of this type describe computation; nothing runs until a [`crate::runtime::Runtime`]
/// (or [`crate::run`]) interprets the description. Equivalent effects may be freely shared and
/// re-run, since every combinator only rewrites the tree.
pub struct Effect<A, E> {
    pub(crate) node: Node,
    _marker: PhantomData<fn() -> (A, E)>,
}

impl<A, E> std::fmt::Debug for Effect<A, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Effect(..)")
    }
}

fn downcast_value<A: 'static>(boxed: AnyBox) -> A {
    *boxed
        .downcast::<A>()
        .unwrap_or_else(|_| panic!("effect value type mismatch: interpreter invariant violated"))
}

impl<A, E> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    pub(crate) fn from_node(node: Node) -> Self {
        Effect {
            node,
            _marker: PhantomData,
        }
    }

    pub(crate) fn into_node(self) -> Node {
        self.node
    }

    /// An already-known success value.
    pub fn succeed(a: A) -> Self {
        Effect::from_node(Node::Pure(Box::new(a)))
    }

    /// An already-known error value.
    pub fn fail(e: E) -> Self {
        Effect::from_node(Node::Fail(AnyError::domain(e)))
    }

    /// Wrap a side-effecting thunk. `thunk` receives the execution context it runs under so it
    /// can cooperate with cancellation; most thunks ignore it.
    pub fn suspend<F>(thunk: F) -> Self
    where
        F: FnOnce(Arc<ExecutionContext>) -> BoxFuture<'static, Result<A, E>> + Send + 'static,
    {
        Effect::suspend_erased(move |ctx| {
            Box::pin(async move {
                match thunk(ctx).await {
                    Ok(a) => Ok(Box::new(a) as AnyBox),
                    Err(e) => Err(AnyError::domain(e)),
                }
            })
        })
    }

    /// Like [`Effect::suspend`], but the thunk already speaks the erased channel directly. Used
    /// internally wherever `E` is itself [`AnyError`] (the widened channel `fork`/`zip_par`
    /// produce) — wrapping such a value again with `AnyError::domain` would bury a structural
    /// signal like `Cancelled` inside a `Domain` box, which [`crate::effect::cont`] does not
    /// special-case.
    pub(crate) fn suspend_erased<F>(thunk: F) -> Self
    where
        F: FnOnce(Arc<ExecutionContext>) -> BoxFuture<'static, Result<AnyBox, AnyError>>
            + Send
            + 'static,
    {
        let thunk: SuspendFn = Box::new(thunk);
        Effect::from_node(Node::Suspend(thunk))
    }

    /// Map the success value. Derived as `flat_map(a => succeed(f(a)))`.
    pub fn map<B, F>(self, f: F) -> Effect<B, E>
    where
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        self.flat_map(move |a| Effect::succeed(f(a)))
    }

    /// Sequence: evaluate `self`, then hand its success value to `k`.
    pub fn flat_map<B, F>(self, k: F) -> Effect<B, E>
    where
        B: Send + 'static,
        F: FnOnce(A) -> Effect<B, E> + Send + 'static,
    {
        let k: FlatMapFn = Box::new(move |boxed| k(downcast_value(boxed)).into_node());
        Effect::from_node(Node::FlatMap(Box::new(self.node), k))
    }

    /// Transform the error channel; success passes through untouched.
    pub fn map_error<E2, F>(self, f: F) -> Effect<A, E2>
    where
        E2: Send + 'static,
        F: FnOnce(E) -> E2 + Send + 'static,
    {
        let f: MapErrFn = Box::new(move |any| match any.downcast_as::<E>() {
            Ok(e) => AnyError::domain(f(e)),
            Err(structural) => structural,
        });
        Effect::from_node(Node::MapError(Box::new(self.node), f))
    }

    /// Catch both branches, each producing a recovery effect of the same result/error type.
    pub fn fold<B, E2, OnErr, OnOk>(self, on_err: OnErr, on_ok: OnOk) -> Effect<B, E2>
    where
        B: Send + 'static,
        E2: Send + 'static,
        OnErr: FnOnce(E) -> Effect<B, E2> + Send + 'static,
        OnOk: FnOnce(A) -> Effect<B, E2> + Send + 'static,
    {
        let on_err: FoldErrFn = Box::new(move |any| match any.downcast_as::<E>() {
            Ok(e) => on_err(e).into_node(),
            Err(structural) => Node::Fail(structural),
        });
        let on_ok: FlatMapFn = Box::new(move |boxed| on_ok(downcast_value(boxed)).into_node());
        Effect::from_node(Node::Fold(Box::new(self.node), on_err, on_ok))
    }

    /// Recover from any error by producing a fallback value of the same success type
    /// (`catch_all(h) ≡ fold(h, succeed)`).
    pub fn catch_all<F>(self, h: F) -> Effect<A, A>
    where
        F: FnOnce(E) -> Effect<A, A> + Send + 'static,
    {
        self.fold(h, Effect::succeed)
    }

    /// Replace any error with a fixed fallback effect (`or_else(fb) ≡ catch_all(_ => fb)`).
    pub fn or_else(self, fallback: Effect<A, A>) -> Effect<A, A> {
        self.catch_all(move |_| fallback)
    }

    /// Never fails: turns the error channel into `Result<A, E>` carried as the success value.
    pub fn attempt(self) -> Effect<Result<A, E>, Result<A, E>> {
        self.fold(
            |e| Effect::succeed(Err(e)),
            |a| Effect::succeed(Ok(a)),
        )
    }

    /// Spawn `self` on a new execution task; the success value is a [`Fiber`] handle. Widens the
    /// error channel to [`AnyError`], since a fork's task runs independently of the caller's own
    /// error type from this point on.
    pub fn fork(self) -> Effect<Fiber, AnyError> {
        Effect::from_node(Node::Fork(Box::new(self.node)))
    }

    /// Like [`Effect::fork`], but records the resulting fiber with `scope` so the scope's exit
    /// protocol waits for it and guarantees no fork outlives its scope.
    pub fn fork_in(self, scope: Arc<EffectScope>) -> Effect<Fiber, AnyError> {
        self.fork().flat_map(move |fiber| {
            let scope = scope.clone();
            Effect::suspend_erased(move |_ctx| {
                Box::pin(async move {
                    match scope.track(fiber.clone()) {
                        Ok(()) => Ok(Box::new(fiber) as AnyBox),
                        Err(e) => Err(e),
                    }
                })
            })
        })
    }

    /// Run `self` and `other` concurrently, combining their successes with `f` once both have
    /// produced a value. Fails if either fails; if both fail, the surfaced error is whichever
    /// fiber terminates first.
    pub fn zip_par<B, C, F>(self, other: Effect<B, E>, f: F) -> Effect<C, E>
    where
        B: Send + 'static,
        C: Send + 'static,
        F: FnOnce(A, B) -> C + Send + 'static,
    {
        crate::effect::parallel::zip_par(self, other, f)
    }
}

