//! Free-function constructors for building effects: `succeed(a)`, `fail(e)`, `from(capability)`,
//! `scoped(body)`, `generate(gen, handler)`. Each is a thin wrapper over an associated function
//! or a direct `Node` build, kept as free functions so they read at the call site the way
//! `pure(a)`/`from_result(r)`-style constructors do elsewhere in this crate's lineage.

use std::sync::Arc;

use crate::capability::{Capability, CapabilityHandler};
use crate::effect::effect::Effect;
use crate::effect::node::{AnyBox, Node};
use crate::error::{AnyError, CapabilityId};
use crate::generator::GenerateFn;
use crate::scope::EffectScope;

/// An already-known success value.
pub fn succeed<A, E>(a: A) -> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    Effect::succeed(a)
}

/// An already-known error value.
pub fn fail<A, E>(e: E) -> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    Effect::fail(e)
}

/// Lift a [`Capability`] into an effect that performs it.
pub fn from<C: Capability>(capability: C) -> Effect<C::Result, AnyError> {
    let node = Node::Perform(crate::capability::PerformNode {
        capability: Box::new(capability),
        id: CapabilityId::of::<C>(),
    });
    Effect::from_node(node)
}

/// Build an effect whose body runs with a fresh [`EffectScope`].
pub fn scoped<A, E, F>(body: F) -> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
    F: FnOnce(Arc<EffectScope>) -> Effect<A, E> + Send + 'static,
{
    let scoped_fn = Box::new(move |scope: Arc<EffectScope>| body(scope).into_node());
    Effect::from_node(Node::Scoped(scoped_fn))
}

/// Build an effect that runs an imperative generator function with `handler` installed.
pub fn generate<A, E, G, H>(generator: G, handler: H) -> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
    G: FnOnce(&crate::generator::GeneratorContext) -> Result<A, E> + Send + 'static,
    H: CapabilityHandler + 'static,
{
    let handler: Arc<dyn CapabilityHandler> = Arc::new(handler);
    let body: GenerateFn = Box::new(move |gen_ctx: &crate::generator::GeneratorContext| {
        match generator(gen_ctx) {
            Ok(a) => Ok(Box::new(a) as AnyBox),
            Err(e) => Err(AnyError::domain(e)),
        }
    });
    Effect::from_node(Node::Generate(body, handler))
}
