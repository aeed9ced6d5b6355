//! Identity, associativity, and recovery properties of the effect algebra.

use millstream::effect::{self, Effect};
use millstream::error::AnyError;
use millstream::runtime::Runtime;

#[derive(Debug, Clone, PartialEq)]
enum DemoError {
    Boom,
    Wrapped(String),
}

impl From<AnyError> for DemoError {
    fn from(_: AnyError) -> Self {
        DemoError::Boom
    }
}

#[tokio::test]
async fn identity_run_succeed_returns_the_value() {
    let result = Runtime::new().run(effect::succeed::<i32, DemoError>(42)).await;
    assert_eq!(result, Ok(42));
}

#[tokio::test]
async fn failure_run_fail_raises_the_error() {
    let result = Runtime::new()
        .run(effect::fail::<i32, DemoError>(DemoError::Boom))
        .await;
    assert_eq!(result, Err(DemoError::Boom));
}

#[tokio::test]
async fn left_identity_succeed_flat_map_equals_k() {
    let via_succeed = Runtime::new()
        .run(effect::succeed::<i32, DemoError>(1).flat_map(|x| effect::succeed(x + 1)))
        .await;
    let direct = Runtime::new().run(effect::succeed::<i32, DemoError>(2)).await;
    assert_eq!(via_succeed, direct);
}

#[tokio::test]
async fn right_identity_flat_map_succeed_equals_self() {
    let via_flat_map = Runtime::new()
        .run(effect::succeed::<i32, DemoError>(7).flat_map(effect::succeed))
        .await;
    let direct = Runtime::new().run(effect::succeed::<i32, DemoError>(7)).await;
    assert_eq!(via_flat_map, direct);
}

#[tokio::test]
async fn associativity_flat_map_chains_agree() {
    fn k1(x: i32) -> Effect<i32, DemoError> {
        effect::succeed(x + 1)
    }
    fn k2(x: i32) -> Effect<i32, DemoError> {
        effect::succeed(x * 2)
    }

    let left = Runtime::new()
        .run(effect::succeed::<i32, DemoError>(3).flat_map(k1).flat_map(k2))
        .await;
    let right = Runtime::new()
        .run(effect::succeed::<i32, DemoError>(3).flat_map(|x| k1(x).flat_map(k2)))
        .await;
    assert_eq!(left, right);
}

#[tokio::test]
async fn pure_chain_of_flat_maps_and_a_map() {
    let program = effect::succeed::<i32, DemoError>(1)
        .flat_map(|x| effect::succeed(x + 1))
        .flat_map(|x| effect::succeed(x * 2))
        .map(|x| x + 10);
    assert_eq!(Runtime::new().run(program).await, Ok(14));
}

#[tokio::test]
async fn catch_all_recovers_after_a_failure() {
    let program = effect::succeed::<i32, DemoError>(1)
        .flat_map(|_| effect::fail(DemoError::Boom))
        .catch_all(|_| effect::succeed(99))
        .map(|x| x + 1);
    assert_eq!(Runtime::new().run(program).await, Ok(100));
}

#[tokio::test]
async fn map_error_transforms_then_catch_all_recovers() {
    let program = effect::fail::<i32, DemoError>(DemoError::Wrapped("io".to_string()))
        .map_error(|e| match e {
            DemoError::Wrapped(msg) => DemoError::Wrapped(format!("wrapped: {msg}")),
            other => other,
        })
        .catch_all(|_| effect::succeed(42));
    assert_eq!(Runtime::new().run(program).await, Ok(42));
}

#[tokio::test]
async fn laziness_constructing_an_effect_runs_nothing() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();
    let _unused: Effect<i32, DemoError> = Effect::suspend(move |_ctx| {
        flag.store(true, Ordering::SeqCst);
        Box::pin(async { Ok(1) })
    });

    assert!(!ran.load(Ordering::SeqCst));
}
