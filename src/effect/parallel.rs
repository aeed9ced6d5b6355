//! Parallel combinators built from `fork` + `join`.
//!
//! `zip_par` starts both sides as fibers, then awaits both joins; `race2`, `par3`, and `par4`
//! compose from there. The unit of concurrency is a `Fiber` (its own executor task) rather than
//! a bare future, since forking is how this runtime achieves structured concurrency, but the
//! "start everything, then await everything" structure is the familiar `join_all` idiom.

use crate::effect::effect::Effect;
use crate::error::AnyError;

/// Start `a` and `b` concurrently; once both have produced a value, combine them with `f`.
/// Fails if either fails; if both fail, the surfaced error is whichever fiber's join resolves
/// first.
pub fn zip_par<A, B, C, E, F>(a: Effect<A, E>, b: Effect<B, E>, f: F) -> Effect<C, E>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    E: Send + 'static,
    F: FnOnce(A, B) -> C + Send + 'static,
{
    a.fork().flat_map(move |fiber_a| {
        b.fork().flat_map(move |fiber_b| {
            Effect::suspend_erased(move |ctx| {
                Box::pin(async move {
                    let fut_a = fiber_a.join_erased(&ctx);
                    let fut_b = fiber_b.join_erased(&ctx);
                    tokio::pin!(fut_a);
                    tokio::pin!(fut_b);

                    // `a_first` records which side's join resolved first, purely to break the
                    // both-fail tie below in favor of whichever fiber actually finished first.
                    let (outcome_a, outcome_b, a_first) = tokio::select! {
                        res = &mut fut_a => {
                            let outcome_b = fut_b.await;
                            (res, outcome_b, true)
                        }
                        res = &mut fut_b => {
                            let outcome_a = fut_a.await;
                            (outcome_a, res, false)
                        }
                    };

                    match (outcome_a, outcome_b) {
                        (Ok(a), Ok(b)) => {
                            let a = *a.downcast::<A>().unwrap_or_else(|_| {
                                panic!("zip_par: left value type mismatch")
                            });
                            let b = *b.downcast::<B>().unwrap_or_else(|_| {
                                panic!("zip_par: right value type mismatch")
                            });
                            Ok(Box::new(f(a, b)) as crate::effect::node::AnyBox)
                        }
                        (Err(e), Ok(_)) => Err(e),
                        (Ok(_), Err(e)) => Err(e),
                        (Err(ea), Err(eb)) => Err(if a_first { ea } else { eb }),
                    }
                })
            })
        })
    })
    .map_error(downcast_pair_error::<E>)
}

/// `zip_par`'s error is produced inside a `suspend_erased` block operating directly on
/// [`AnyError`] (see its doc comment for why), so the combinator's public error type `E` is
/// recovered here the same way `Effect::map_error`/`fold` do internally.
fn downcast_pair_error<E: Send + 'static>(any: AnyError) -> E {
    any.downcast_as::<E>()
        .unwrap_or_else(|_| panic!("zip_par: error type mismatch"))
}

/// Race `a` against `b` — whichever fiber finishes first (success or failure) wins; the other is
/// interrupted. A natural complement to `zip_par`: the two share a fork-both, join-whichever
/// family of combinators built from the same pair of fibers.
pub fn race2<A, E>(a: Effect<A, E>, b: Effect<A, E>) -> Effect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    a.fork().flat_map(move |fiber_a| {
        b.fork().flat_map(move |fiber_b| {
            Effect::suspend_erased(move |ctx| {
                Box::pin(async move {
                    tokio::select! {
                        outcome = fiber_a.join_erased(&ctx) => {
                            fiber_b.interrupt();
                            outcome
                        }
                        outcome = fiber_b.join_erased(&ctx) => {
                            fiber_a.interrupt();
                            outcome
                        }
                    }
                })
            })
        })
    })
    .map_error(downcast_pair_error::<E>)
}

/// Three-way parallel combination, implemented as nested `zip_par`.
pub fn par3<A, B, C, D, E, F>(a: Effect<A, E>, b: Effect<B, E>, c: Effect<C, E>, f: F) -> Effect<D, E>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    D: Send + 'static,
    E: Send + 'static,
    F: FnOnce(A, B, C) -> D + Send + 'static,
{
    zip_par(zip_par(a, b, |a, b| (a, b)), c, move |(a, b), c| f(a, b, c))
}

/// Four-way parallel combination, implemented as nested `zip_par`.
pub fn par4<A, B, C, D, R, E, F>(
    a: Effect<A, E>,
    b: Effect<B, E>,
    c: Effect<C, E>,
    d: Effect<D, E>,
    f: F,
) -> Effect<R, E>
where
    A: Send + 'static,
    B: Send + 'static,
    C: Send + 'static,
    D: Send + 'static,
    R: Send + 'static,
    E: Send + 'static,
    F: FnOnce(A, B, C, D) -> R + Send + 'static,
{
    zip_par(
        zip_par(a, b, |a, b| (a, b)),
        zip_par(c, d, |c, d| (c, d)),
        move |(a, b), (c, d)| f(a, b, c, d),
    )
}
