//! Capabilities and capability handlers.
//!
//! A [`Capability`] is opaque data describing a side effect request; a [`CapabilityHandler`]
//! interprets it. Handlers are plain values, composed by fallback rather than by exceptions: a
//! handler that doesn't recognize a capability returns an explicit [`Outcome::NotMine`] rather
//! than panicking or raising a cast failure.
//!
//! `CapabilityHandler::handle` takes `&dyn Any` rather than a generic capability type, which
//! keeps the trait object-safe (`Arc<dyn CapabilityHandler>` lives directly on
//! [`crate::context::ExecutionContext`] with no separate erasure layer needed) at the cost of
//! pushing the downcast into each handler body. [`for_capability`] recovers the ergonomic,
//! per-capability-type style for the common case of a handler that only ever answers one
//! capability, encoding the capability as a pair (payload, result-kind token) where the token is
//! the capability's own `TypeId`, recovered through `Any::downcast_ref`.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{BoxedDomain, CapabilityId};

/// An opaque, typed request for a side effect.
///
/// Capabilities carry no behavior — they are data, interpreted elsewhere by a
/// [`CapabilityHandler`]. `Result` names the type a handler produces on success.
pub trait Capability: Any + Send + Sync + 'static {
    /// The type a handler produces when it accepts this capability.
    type Result: Send + 'static;
}

/// What a handler did with the capability it was offered, fully erased.
pub enum Outcome {
    /// The handler accepted and interpreted the capability. Boxes the capability's declared
    /// `Result` type; the typed boundary that issued the `PerformCapability` node downcasts it
    /// back.
    Handled(BoxedDomain),
    /// "Not mine" — try the next handler in the fallback chain.
    NotMine,
    /// The handler accepted the capability but failed while interpreting it. Boxes the effect's
    /// declared error type.
    Failed(BoxedDomain),
}

/// What a [`SingleCapabilityHandler`] does with the one capability type it knows about.
pub enum TypedOutcome<R> {
    /// Accepted and produced a result.
    Handled(R),
    /// Not actually able to service this particular value (rare — most single-capability
    /// handlers that get a type match also accept it, but the option exists for handlers that
    /// reject based on the capability's contents).
    NotMine,
    /// Accepted but failed.
    Failed(BoxedDomain),
}

/// A polymorphic interpreter mapping capabilities to results.
///
/// Object-safe: stored as `Arc<dyn CapabilityHandler>` inside
/// [`crate::context::ExecutionContext`]. Most handlers should not implement this directly —
/// prefer [`SingleCapabilityHandler`] plus [`for_capability`] and chain with
/// [`CapabilityHandlerExt::or_else`].
pub trait CapabilityHandler: Send + Sync {
    /// Interpret `capability`, whose concrete type this handler must discover itself (typically
    /// with `capability.downcast_ref::<C>()`).
    fn handle(&self, capability: &dyn Any) -> Outcome;
}

impl<H: CapabilityHandler + ?Sized> CapabilityHandler for Arc<H> {
    fn handle(&self, capability: &dyn Any) -> Outcome {
        (**self).handle(capability)
    }
}

/// Fallback chaining for any [`CapabilityHandler`].
pub trait CapabilityHandlerExt: CapabilityHandler + Sized {
    /// Try `self` first; anything it rejects with [`Outcome::NotMine`] is retried against
    /// `other`.
    fn or_else<H: CapabilityHandler>(self, other: H) -> Fallback<Self, H> {
        Fallback {
            first: self,
            second: other,
        }
    }
}

impl<H: CapabilityHandler> CapabilityHandlerExt for H {}

/// Two handlers tried in order. Built by [`CapabilityHandlerExt::or_else`] or [`compose`].
pub struct Fallback<A, B> {
    first: A,
    second: B,
}

impl<A: CapabilityHandler, B: CapabilityHandler> CapabilityHandler for Fallback<A, B> {
    fn handle(&self, capability: &dyn Any) -> Outcome {
        match self.first.handle(capability) {
            Outcome::NotMine => self.second.handle(capability),
            other => other,
        }
    }
}

/// An n-ary fallback chain, tried in declaration order.
pub struct Composite {
    handlers: Vec<Arc<dyn CapabilityHandler>>,
}

/// Build a composite handler from a list of handlers, tried in order.
pub fn compose(handlers: Vec<Arc<dyn CapabilityHandler>>) -> Composite {
    Composite { handlers }
}

impl CapabilityHandler for Composite {
    fn handle(&self, capability: &dyn Any) -> Outcome {
        for handler in &self.handlers {
            match handler.handle(capability) {
                Outcome::NotMine => continue,
                other => return other,
            }
        }
        Outcome::NotMine
    }
}

/// A handler that only ever answers capabilities of one concrete type `C`.
///
/// This is the shape most user code implements; [`for_capability`] erases it into a
/// [`CapabilityHandler`] that first checks the capability's type and defers to
/// [`Outcome::NotMine`] on mismatch.
pub trait SingleCapabilityHandler<C: Capability>: Send + Sync {
    /// Interpret a capability already known to be of type `C`.
    fn handle_one(&self, capability: &C) -> TypedOutcome<C::Result>;
}

/// Adapt a [`SingleCapabilityHandler<C>`] into an object-safe [`CapabilityHandler`].
pub struct OfCapability<C, H> {
    handler: H,
    _capability: PhantomData<fn(&C)>,
}

/// Build a [`CapabilityHandler`] that answers only capability type `C`, delegating to `handler`.
pub fn for_capability<C, H>(handler: H) -> OfCapability<C, H>
where
    C: Capability,
    H: SingleCapabilityHandler<C>,
{
    OfCapability {
        handler,
        _capability: PhantomData,
    }
}

impl<C, H> CapabilityHandler for OfCapability<C, H>
where
    C: Capability,
    H: SingleCapabilityHandler<C>,
{
    fn handle(&self, capability: &dyn Any) -> Outcome {
        match capability.downcast_ref::<C>() {
            None => Outcome::NotMine,
            Some(c) => match self.handler.handle_one(c) {
                TypedOutcome::Handled(result) => Outcome::Handled(Box::new(result)),
                TypedOutcome::NotMine => Outcome::NotMine,
                TypedOutcome::Failed(error) => Outcome::Failed(error),
            },
        }
    }
}

/// The erased node stored in the effect tree for `PerformCapability`.
pub(crate) struct PerformNode {
    pub(crate) capability: Box<dyn Any + Send + Sync>,
    pub(crate) id: CapabilityId,
}
