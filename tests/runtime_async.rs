//! `run_async` and `CancellationHandle`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use millstream::effect::Effect;
use millstream::error::AnyError;
use millstream::runtime::Runtime;

/// A sleep that polls the context's cancellation flag instead of blocking through it, so a
/// cancel issued partway through is visible well before `millis` elapses.
fn cancellable_sleep(millis: u64) -> Effect<(), AnyError> {
    Effect::suspend(move |ctx| {
        Box::pin(async move {
            let deadline = tokio::time::Instant::now() + Duration::from_millis(millis);
            while tokio::time::Instant::now() < deadline {
                if ctx.is_cancelled() {
                    return Ok(());
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            Ok(())
        })
    })
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelling_before_completion_suppresses_the_success_callback() {
    let on_ok_fired = Arc::new(AtomicBool::new(false));
    let flag = on_ok_fired.clone();

    let handle = Runtime::new().run_async::<(), AnyError, _, _>(
        cancellable_sleep(5_000),
        move |()| flag.store(true, Ordering::SeqCst),
        |_err| panic!("on_err should not fire for a clean cancellation"),
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.cancel();
    assert!(handle.is_cancelled());

    handle.join().await;
    assert!(
        !on_ok_fired.load(Ordering::SeqCst),
        "on_ok must not fire once the handle was cancelled first"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn run_async_invokes_on_ok_when_left_uncancelled() {
    let on_ok_fired = Arc::new(AtomicBool::new(false));
    let flag = on_ok_fired.clone();

    let handle = Runtime::new().run_async::<(), AnyError, _, _>(
        cancellable_sleep(10),
        move |()| flag.store(true, Ordering::SeqCst),
        |_err| panic!("unexpected error"),
    );

    handle.join().await;
    assert!(on_ok_fired.load(Ordering::SeqCst));
}

#[tokio::test(flavor = "multi_thread")]
async fn join_timeout_reports_whether_the_task_finished_in_time() {
    let handle = Runtime::new().run_async::<(), AnyError, _, _>(
        cancellable_sleep(500),
        |()| {},
        |_err| panic!("unexpected error"),
    );

    assert!(!handle.join_timeout(Duration::from_millis(20)).await);
    assert!(handle.join_timeout(Duration::from_secs(2)).await);
}
