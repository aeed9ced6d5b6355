//! # millstream
//!
//! An effect runtime: a small, stack-safe algebra for describing computations that may fail,
//! suspend, fork into concurrent fibers, and perform capabilities through swappable handlers —
//! interpreted by a trampoline rather than native recursion, so a million-deep `flat_map` chain
//! runs in constant native stack.
//!
//! ## Philosophy
//!
//! The effect tree is a closed, type-erased sum underneath a statically typed front door
//! ([`Effect<A, E>`](effect::Effect)); every combinator on it only ever rewrites the tree, so
//! constructing an effect performs no user-visible side effect — only a [`runtime::Runtime`]
//! (or its free-function shorthand [`run`]) actually evaluates one.
//!
//! ## Quick example
//!
//! ```rust
//! use millstream::effect::{self, Effect};
//! use millstream::error::AnyError;
//! use millstream::runtime::Runtime;
//!
//! # async fn run() {
//! let program: Effect<i32, AnyError> = effect::succeed(1)
//!     .flat_map(|x| effect::succeed(x + 1))
//!     .map(|x| x * 2);
//!
//! let result = Runtime::new().run(program).await;
//! assert_eq!(result, Ok(4));
//! # }
//! ```
//!
//! ## Structured concurrency
//!
//! `scoped` bodies fork fibers that cannot outlive the scope: whether the body succeeds, fails,
//! or is cancelled, every fork it tracked is either complete or interrupted before the `scoped`
//! effect itself returns (see [`scope::EffectScope`]).
//!
//! ## Capabilities
//!
//! Side effects are requested as data (a [`capability::Capability`]) and interpreted by a
//! [`capability::CapabilityHandler`] installed per run. Production code performs capabilities
//! against a real handler; tests perform the same capabilities against
//! [`testing::Recorder`] or a handler built from [`capability::for_capability`], with no mocking
//! framework involved.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod capability;
mod context;
pub mod effect;
pub mod error;
mod fiber;
pub mod generator;
pub mod runtime;
mod scope;
pub mod testing;

pub use context::ExecutionContext;
pub use effect::Effect;
pub use fiber::{Fiber, FiberId};
pub use scope::EffectScope;

/// Run `effect` on a fresh [`runtime::Runtime`] built from the default [`runtime::TokioExecutor`].
///
/// Shorthand for `Runtime::new().run(effect).await`; reach for [`runtime::Runtime`] directly when
/// a program needs a non-default executor, `run_with_handler`, or `run_async`.
pub async fn run<A, E>(effect: Effect<A, E>) -> Result<A, E>
where
    A: Send + 'static,
    E: From<error::AnyError> + Send + 'static,
{
    runtime::Runtime::new().run(effect).await
}

/// Convenient re-exports for the common case: building and running effects against capabilities.
pub mod prelude {
    pub use crate::capability::{
        Capability, CapabilityHandler, CapabilityHandlerExt, for_capability,
    };
    pub use crate::effect::{self, Effect};
    pub use crate::error::AnyError;
    pub use crate::runtime::Runtime;
    pub use crate::{EffectScope, Fiber};
}
