//! Imperative generator bodies.
//!
//! A generator is a plain synchronous function; it reenters the trampoline for each sub-effect
//! it wants evaluated by blocking the current task on it with [`tokio::task::block_in_place`] +
//! `Handle::current().block_on`, the same `Handle::current()` fallback an async-bridging runtime
//! uses to call back into synchronous code. This keeps the generator itself
//! `fn(&GeneratorContext) -> ...`, never `async fn`: it runs on the same executor task as the
//! enclosing interpreter call, and is neither restartable nor multi-shot.

use std::sync::Arc;

use crate::capability::{Capability, CapabilityHandler};
use crate::context::ExecutionContext;
use crate::effect::node::{AnyBox, Node};
use crate::error::{AnyError, CapabilityId};

/// The erased body of a `Generate` node: a synchronous closure driving a [`GeneratorContext`]
/// to completion and producing a success or error value, both boxed.
pub(crate) type GenerateFn =
    Box<dyn FnOnce(&GeneratorContext) -> Result<AnyBox, AnyError> + Send>;

/// The handle passed to a running generator body.
///
/// Every operation reenters [`crate::effect::interpreter::run_node`] synchronously on the
/// calling thread via `block_in_place`, so it never races the generator's own sequential logic.
pub struct GeneratorContext {
    ctx: Arc<ExecutionContext>,
}

impl GeneratorContext {
    pub(crate) fn new(ctx: Arc<ExecutionContext>) -> Self {
        GeneratorContext { ctx }
    }

    /// Evaluate `cap` through the currently bound handler, blocking the generator until the
    /// handler returns.
    pub fn perform<C: Capability>(&self, capability: C) -> Result<C::Result, AnyError> {
        let node = Node::Perform(crate::capability::PerformNode {
            capability: Box::new(capability),
            id: CapabilityId::of::<C>(),
        });
        let boxed = self.block_on_node(node)?;
        Ok(*downcast_result::<C::Result>(boxed)?)
    }

    /// Build an [`Effect`](crate::effect::Effect) that will perform `cap` without evaluating it
    /// now.
    pub fn lift<C: Capability>(&self, capability: C) -> crate::effect::Effect<C::Result, AnyError> {
        crate::effect::from(capability)
    }

    /// Run a user thunk under the generator's error-handling discipline: a panic unwinds as a
    /// host error rather than poisoning the calling task.
    pub fn call<T, F>(&self, thunk: F) -> Result<T, AnyError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, AnyError> + std::panic::UnwindSafe,
    {
        match std::panic::catch_unwind(thunk) {
            Ok(result) => result,
            Err(payload) => Err(AnyError::HostError(panic_message(payload))),
        }
    }

    /// Reenter the trampoline for an arbitrary sub-effect, returning its value and propagating
    /// its error.
    pub fn yield_effect<A, E>(&self, effect: crate::effect::Effect<A, E>) -> Result<A, E>
    where
        A: Send + 'static,
        E: Send + 'static,
    {
        let boxed = self
            .block_on_node(effect.into_node())
            .map_err(|any| any.downcast::<E>().unwrap_or_else(|_| panic!(
                "generator sub-effect raised an error outside its declared type"
            )))?;
        Ok(*downcast_result::<A>(boxed).unwrap_or_else(|_| {
            panic!("generator sub-effect produced a value outside its declared type")
        }))
    }

    /// The handler installed for this generator's context, for composition with
    /// [`crate::capability::CapabilityHandlerExt::or_else`].
    pub fn handler(&self) -> Option<Arc<dyn CapabilityHandler>> {
        self.ctx.resolve_handler()
    }

    fn block_on_node(&self, node: Node) -> Result<AnyBox, AnyError> {
        let ctx = self.ctx.clone();
        tokio::task::block_in_place(move || {
            tokio::runtime::Handle::current()
                .block_on(crate::effect::interpreter::run_node(node, ctx))
        })
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "generator thunk panicked with a non-string payload".to_string()
    }
}

fn downcast_result<T: 'static>(boxed: AnyBox) -> Result<Box<T>, AnyError> {
    boxed
        .downcast::<T>()
        .map_err(|_| AnyError::HostError("generator value downcast mismatch".to_string()))
}
