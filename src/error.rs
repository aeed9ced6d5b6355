//! The runtime's top-level, type-erased error.
//!
//! Every [`crate::effect::Effect`] is parameterized by a concrete domain error type `E`, but a
//! handful of operations cannot stay generic over `E`: a [`crate::fiber::Fiber`] may be stored
//! alongside fibers running completely unrelated effects (inside an
//! [`crate::scope::EffectScope`]'s child set), and cancellation, missing handlers, and handler
//! failures are not values the effect's own error type ever promised to represent. `AnyError` is
//! the widened error channel those operations use.
//!
//! Written as a hand-rolled `enum` with manual `Display`/`Error` impls rather than reached for
//! via a derive-macro crate like `thiserror`.

use std::any::{Any, TypeId};
use std::fmt;

/// A type-erased domain error, downcast back to a concrete `E` at the boundary that knows it.
pub type BoxedDomain = Box<dyn Any + Send>;

/// Identifies which capability a handler was asked to interpret, for diagnostics only.
///
/// Carries enough information to produce a readable "no handler for X" message without
/// requiring capabilities to implement `Debug` or participate in a registration/DI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityId {
    type_id: TypeId,
    type_name: &'static str,
}

impl CapabilityId {
    /// Build the id for capability type `C`.
    pub fn of<C: 'static>() -> Self {
        CapabilityId {
            type_id: TypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
        }
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)
    }
}

/// The runtime's widened error channel.
///
/// Produced whenever an effect's concrete error type `E` cannot be preserved: at a [`Fork`]
/// boundary, when a capability has no bound handler, when a bound handler itself fails, when a
/// `Suspend` thunk panics with a value outside its declared error type, and as the structural
/// signal for cancellation.
///
/// [`Fork`]: crate::effect::Effect::fork
pub enum AnyError {
    /// A domain error from the effect that produced it, boxed because the erased interpreter
    /// does not track `E` directly. Downcast with [`AnyError::downcast`].
    Domain(BoxedDomain),
    /// The structural, non-recoverable cancellation signal. `Fold` and `MapError` must not turn
    /// this into a success or a different error — see `effect::cont::ContFrame` for where that
    /// rule is enforced.
    Cancelled,
    /// `PerformCapability` was evaluated but no handler in the resolved chain accepted the
    /// capability.
    HandlerMissing(CapabilityId),
    /// A bound handler accepted the capability but failed while interpreting it. The payload is
    /// the handler's own boxed error.
    HandlerFailure(BoxedDomain),
    /// A `Suspend` thunk raised something outside its declared error type (for example a Rust
    /// panic caught at the fork boundary).
    HostError(String),
}

impl AnyError {
    /// Box a domain error of concrete type `E` into the erased channel.
    pub fn domain<E: Send + 'static>(error: E) -> Self {
        AnyError::Domain(Box::new(error))
    }

    /// Recover the concrete domain error of type `E`, if this is a `Domain` variant holding one.
    ///
    /// Returns `Err(self)` unchanged when the variant is not `Domain` or the boxed value is not
    /// actually an `E` — the latter should not happen in code built through the public
    /// combinators, since each `Domain` box is created and consumed by the same typed boundary.
    pub fn downcast<E: 'static>(self) -> Result<E, Self> {
        match self {
            AnyError::Domain(boxed) => match boxed.downcast::<E>() {
                Ok(value) => Ok(*value),
                Err(boxed) => Err(AnyError::Domain(boxed)),
            },
            other => Err(other),
        }
    }

    /// Like [`AnyError::downcast`], but also succeeds when `E` is `AnyError` itself: the widened
    /// channel produced by `Fork`/`zip_par` uses `AnyError` as its own declared error type, and
    /// in that case every variant (not just `Domain`) is a legitimate value for a `catch_all` or
    /// `map_error` closure to see. `cont::unwind` already keeps `Cancelled` from ever reaching
    /// those closures in the first place, so cancellation still bypasses recovery either way.
    pub(crate) fn downcast_as<E: Send + 'static>(self) -> Result<E, AnyError> {
        let boxed: Box<dyn Any> = Box::new(self);
        match boxed.downcast::<E>() {
            Ok(exact) => Ok(*exact),
            Err(boxed) => {
                let any = *boxed
                    .downcast::<AnyError>()
                    .expect("box was constructed from an AnyError above");
                any.downcast::<E>()
            }
        }
    }

    /// True for the structural cancellation signal.
    ///
    /// `Fold`/`MapError` unwinding consults this before calling user recovery closures, so
    /// cancellation is never mistaken for a recoverable error.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnyError::Cancelled)
    }
}

impl fmt::Debug for AnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyError::Domain(_) => f.write_str("AnyError::Domain(..)"),
            AnyError::Cancelled => f.write_str("AnyError::Cancelled"),
            AnyError::HandlerMissing(id) => {
                write!(f, "AnyError::HandlerMissing({id})")
            }
            AnyError::HandlerFailure(_) => f.write_str("AnyError::HandlerFailure(..)"),
            AnyError::HostError(msg) => write!(f, "AnyError::HostError({msg:?})"),
        }
    }
}

impl fmt::Display for AnyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyError::Domain(_) => write!(f, "domain error"),
            AnyError::Cancelled => write!(f, "cancelled"),
            AnyError::HandlerMissing(id) => write!(f, "no handler bound for capability {id}"),
            AnyError::HandlerFailure(_) => write!(f, "capability handler failed"),
            AnyError::HostError(msg) => write!(f, "unexpected host error: {msg}"),
        }
    }
}

impl std::error::Error for AnyError {}
