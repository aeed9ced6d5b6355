//! The stack-safe trampoline.
//!
//! A loop, not recursion: every descent into a child effect replaces native recursion with a
//! `current := ...` assignment plus a continuation-frame push, so native stack depth stays
//! bounded independent of the effect tree's depth. The only places this function recurses into
//! itself on the same native stack are `Scoped` (bounded by lexical scope nesting) and the
//! capability dispatch reached through `Generate`, both user-controlled exceptions to the
//! stack-safety invariant rather than something arbitrarily deep user code can trigger by
//! accident.

use std::sync::Arc;

use crate::capability::Outcome;
use crate::context::ExecutionContext;
use crate::effect::cont::{self, ContFrame, Step};
use crate::effect::node::{AnyBox, BoxFuture, Node};
use crate::error::AnyError;
use crate::generator::GeneratorContext;
use crate::scope::EffectScope;

/// Advance `node` to completion under `ctx`, returning its erased outcome.
///
/// Boxed because the `Scoped` arm calls back into this function before this future resolves —
/// ordinary `async fn` recursion produces an infinitely-sized future, so the indirection through
/// `Box::pin` is required, not a style choice.
pub(crate) fn run_node(
    node: Node,
    ctx: Arc<ExecutionContext>,
) -> BoxFuture<'static, Result<AnyBox, AnyError>> {
    Box::pin(async move {
        let mut current: Option<Node> = Some(node);
        let mut value: Option<AnyBox> = None;
        let mut error: Option<AnyError> = None;
        let mut conts: Vec<ContFrame> = Vec::new();

        loop {
            // 1. Cancellation checkpoint — runs every iteration and preempts whatever the loop
            // was otherwise about to do.
            if ctx.is_cancelled() {
                current = None;
                value = None;
                error = Some(AnyError::Cancelled);
            }

            // 2. Unwinding on error.
            if let Some(err) = error.take() {
                match cont::unwind(&mut conts, err) {
                    Step::Finished(outcome) => return outcome,
                    Step::Next(next) => {
                        current = Some(next);
                        continue;
                    }
                }
            }

            // 3. Resumption on value.
            if current.is_none() {
                if let Some(v) = value.take() {
                    match cont::resume(&mut conts, v) {
                        Step::Finished(outcome) => return outcome,
                        Step::Next(next) => {
                            current = Some(next);
                            continue;
                        }
                    }
                }
            }

            // 4. Node evaluation.
            let node = match current.take() {
                Some(node) => node,
                None => unreachable!(
                    "trampoline has neither a pending node, a value, nor an error to act on"
                ),
            };

            match node {
                Node::Pure(a) => value = Some(a),
                Node::Fail(e) => error = Some(e),
                Node::Suspend(thunk) => match thunk(ctx.clone()).await {
                    Ok(v) => value = Some(v),
                    Err(e) => error = Some(e),
                },
                Node::FlatMap(src, k) => {
                    conts.push(ContFrame::Seq(k));
                    current = Some(*src);
                }
                Node::Fold(src, on_err, on_ok) => {
                    conts.push(ContFrame::Fold(on_err, on_ok));
                    current = Some(*src);
                }
                Node::MapError(src, f) => {
                    conts.push(ContFrame::MapErr(f));
                    current = Some(*src);
                }
                Node::Fork(inner) => {
                    let executor = ctx
                        .resolve_executor()
                        .unwrap_or_else(crate::runtime::executor::default_executor);
                    let fiber = crate::runtime::executor::execute_fork_on(&executor, *inner, &ctx);
                    value = Some(Box::new(fiber));
                }
                Node::Scoped(body) => match run_scoped(body, &ctx).await {
                    Ok(v) => value = Some(v),
                    Err(e) => error = Some(e),
                },
                Node::Generate(body, handler) => {
                    let installed_ctx = ctx.with_handler(handler);
                    let gen_ctx = GeneratorContext::new(installed_ctx);
                    match body(&gen_ctx) {
                        Ok(v) => value = Some(v),
                        Err(e) => error = Some(e),
                    }
                }
                Node::Perform(perform) => match ctx.resolve_handler() {
                    None => error = Some(AnyError::HandlerMissing(perform.id)),
                    Some(handler) => match handler.handle(&*perform.capability) {
                        Outcome::Handled(result) => value = Some(result),
                        Outcome::NotMine => error = Some(AnyError::HandlerMissing(perform.id)),
                        Outcome::Failed(domain_error) => {
                            error = Some(AnyError::HandlerFailure(domain_error))
                        }
                    },
                },
            }
        }
    })
}

/// The scope-exit protocol.
async fn run_scoped(
    body: crate::effect::node::ScopedFn,
    parent_ctx: &Arc<ExecutionContext>,
) -> Result<AnyBox, AnyError> {
    let scope = EffectScope::new(parent_ctx);
    let body_node = body(scope.clone());
    let body_ctx = scope.context().clone();

    #[cfg(feature = "tracing")]
    let body_outcome = {
        use tracing::Instrument;
        run_node(body_node, body_ctx)
            .instrument(tracing::trace_span!("scoped"))
            .await
    };
    #[cfg(not(feature = "tracing"))]
    let body_outcome = run_node(body_node, body_ctx).await;

    match body_outcome {
        Ok(value) => {
            scope.cancel_all();
            let child_outcomes = scope.join_all().await;
            match first_error(child_outcomes) {
                Some(child_error) => Err(child_error),
                None => Ok(value),
            }
        }
        Err(body_error) => {
            scope.cancel_all();
            // Children's own errors during forced cancellation are dropped: the body's error
            // always wins.
            let _ = scope.join_all().await;
            Err(body_error)
        }
    }
}

/// The first non-cancellation error among `outcomes`, if any.
///
/// A child reporting `Cancelled` here is only telling us it observed the interruption
/// `scope.cancel_all()` just raised on the success path below — that is the scope-exit protocol
/// working as intended, not a child failure, so it must not turn a successful body into an
/// overall failure.
fn first_error(outcomes: Vec<Result<(), AnyError>>) -> Option<AnyError> {
    outcomes
        .into_iter()
        .find_map(|outcome| outcome.err())
        .filter(|err| !err.is_cancelled())
}
