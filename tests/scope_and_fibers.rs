//! Structured concurrency: scope containment, cancellation monotonicity, and forked children
//! being interrupted rather than awaited when their enclosing scope exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use millstream::effect::{self, Effect};
use millstream::error::AnyError;
use millstream::runtime::Runtime;

fn sleeping_flag(millis: u64, flag: Arc<AtomicBool>) -> Effect<(), AnyError> {
    Effect::suspend(move |_ctx| {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn scoped_cancel_on_exit_does_not_wait_for_children() {
    let completed = Arc::new(AtomicBool::new(false));
    let child_flag = completed.clone();

    let program: Effect<&'static str, AnyError> = effect::scoped(move |scope| {
        let sleeper = sleeping_flag(5_000, child_flag);
        sleeper.fork_in(scope).flat_map(|_fiber| effect::succeed("done"))
    });

    let result = Runtime::new().run(program).await;
    assert_eq!(result, Ok("done"));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(
        !completed.load(Ordering::SeqCst),
        "forked child must not complete after its enclosing scope returned"
    );
}

fn settle() -> Effect<(), AnyError> {
    Effect::suspend(move |_ctx| {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        })
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn scope_surfaces_child_error_after_successful_body() {
    let program: Effect<(), AnyError> = effect::scoped(|scope| {
        let failing: Effect<(), AnyError> =
            effect::fail(AnyError::HostError("child failed".to_string()));
        // Give the (immediately-failing) forked child time to actually complete before the
        // body returns, so the scope-exit protocol observes its real error rather than racing
        // it against its own teardown cancellation.
        failing.fork_in(scope).flat_map(|_fiber| settle())
    });

    let result = Runtime::new().run(program).await;
    assert!(result.is_err(), "a failing tracked child must fail the scope");
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_is_monotonic_and_visible_to_descendants() {
    let ctx = millstream::ExecutionContext::root().child();
    assert!(!ctx.is_cancelled());
    ctx.cancel();
    assert!(ctx.is_cancelled());

    let descendant = ctx.child();
    assert!(
        descendant.is_cancelled(),
        "a context derived after cancellation must observe it immediately"
    );

    ctx.cancel();
    assert!(ctx.is_cancelled(), "cancel must stay idempotent and stay cancelled");
}

#[tokio::test(flavor = "multi_thread")]
async fn forked_fiber_joins_to_its_success_value() {
    let program: Effect<i32, AnyError> = effect::succeed::<i32, AnyError>(5)
        .fork()
        .flat_map(|fiber| fiber.join::<i32>());

    let result = Runtime::new().run(program).await;
    assert_eq!(result, Ok(5));
}

#[tokio::test(flavor = "multi_thread")]
async fn fiber_join_is_single_consumer() {
    let root = millstream::ExecutionContext::root();
    let fiber = Runtime::new().execute_fork(effect::succeed::<i32, AnyError>(5), &root);

    tokio::time::sleep(Duration::from_millis(20)).await;

    let first: Effect<i32, AnyError> = fiber.join();
    let second: Effect<i32, AnyError> = fiber.join();

    assert_eq!(Runtime::new().run(first).await, Ok(5));
    assert!(Runtime::new().run(second).await.is_err());
}
