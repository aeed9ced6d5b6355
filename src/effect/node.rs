//! The erased effect tree.
//!
//! [`Effect<A, E>`](crate::effect::Effect) is the statically typed front door; underneath, every
//! node operates on [`AnyBox`] (`Box<dyn Any + Send>`) and [`AnyError`], and the typed wrapper is
//! responsible for boxing values in and downcasting them back out at its boundary — a closed sum
//! with `Box<dyn Any>` payloads and `downcast` at the edges, rather than unsafe casts.
//!
//! `Node` itself is never exposed publicly; it is an implementation detail of the interpreter.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::capability::CapabilityHandler;
use crate::context::ExecutionContext;
use crate::error::AnyError;
use crate::scope::EffectScope;

/// A type-erased success value.
pub(crate) type AnyBox = Box<dyn Any + Send>;

/// A boxed, `Send` future, used for anything that must run to completion before the trampoline
/// can continue.
pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub(crate) type ErasedResult = Result<AnyBox, AnyError>;

/// A synchronous-or-asynchronous side-effecting thunk. It is handed the execution context it is
/// running under so that long-running thunks can cooperate with cancellation if they choose to.
pub(crate) type SuspendFn =
    Box<dyn FnOnce(Arc<ExecutionContext>) -> BoxFuture<'static, ErasedResult> + Send>;

pub(crate) type FlatMapFn = Box<dyn FnOnce(AnyBox) -> Node + Send>;
pub(crate) type FoldErrFn = Box<dyn FnOnce(AnyError) -> Node + Send>;
pub(crate) type MapErrFn = Box<dyn FnOnce(AnyError) -> AnyError + Send>;
pub(crate) type ScopedFn = Box<dyn FnOnce(Arc<EffectScope>) -> Node + Send>;

/// The closed sum of effect nodes.
pub(crate) enum Node {
    Pure(AnyBox),
    Fail(AnyError),
    Suspend(SuspendFn),
    FlatMap(Box<Node>, FlatMapFn),
    Fold(Box<Node>, FoldErrFn, FlatMapFn),
    MapError(Box<Node>, MapErrFn),
    Fork(Box<Node>),
    Scoped(ScopedFn),
    /// `(body, handler)` — the handler is installed in a child context before `body` runs.
    Generate(crate::generator::GenerateFn, Arc<dyn CapabilityHandler>),
    Perform(crate::capability::PerformNode),
}
