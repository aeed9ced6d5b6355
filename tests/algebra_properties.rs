//! Property-based tests for the effect algebra's monadic laws and for cancellation
//! monotonicity, generated with `proptest` rather than pinned to single fixed examples.

use proptest::prelude::*;

use millstream::effect::{self, Effect};
use millstream::error::AnyError;
use millstream::runtime::Runtime;
use millstream::ExecutionContext;

fn run_sync<A>(effect: Effect<A, AnyError>) -> Result<A, AnyError>
where
    A: Send + 'static,
{
    tokio::runtime::Runtime::new()
        .unwrap()
        .block_on(millstream::runtime::Runtime::new().run(effect))
}

proptest! {
    #[test]
    fn prop_left_identity_succeed_flat_map_equals_k(x in any::<i32>(), k in any::<i32>()) {
        let via_succeed = run_sync(
            effect::succeed::<i32, AnyError>(x).flat_map(move |v| effect::succeed(v.wrapping_add(k))),
        );
        let direct = run_sync(effect::succeed::<i32, AnyError>(x.wrapping_add(k)));
        prop_assert_eq!(via_succeed.ok(), direct.ok());
    }

    #[test]
    fn prop_right_identity_flat_map_succeed_equals_self(x in any::<i32>()) {
        let via_flat_map = run_sync(effect::succeed::<i32, AnyError>(x).flat_map(effect::succeed));
        let direct = run_sync(effect::succeed::<i32, AnyError>(x));
        prop_assert_eq!(via_flat_map.ok(), direct.ok());
    }

    #[test]
    fn prop_associativity_flat_map_chains_agree(x in any::<i32>(), j in any::<i32>(), k in any::<i32>()) {
        let k1 = move |v: i32| effect::succeed::<i32, AnyError>(v.wrapping_add(j));
        let k2 = move |v: i32| effect::succeed::<i32, AnyError>(v.wrapping_add(k));

        let left = run_sync(effect::succeed::<i32, AnyError>(x).flat_map(k1).flat_map(k2));
        let right = run_sync(effect::succeed::<i32, AnyError>(x).flat_map(move |v| k1(v).flat_map(k2)));
        prop_assert_eq!(left.ok(), right.ok());
    }

    #[test]
    fn prop_map_matches_flat_map_succeed(x in any::<i32>(), k in any::<i32>()) {
        let via_map = run_sync(effect::succeed::<i32, AnyError>(x).map(move |v| v.wrapping_add(k)));
        let via_flat_map = run_sync(
            effect::succeed::<i32, AnyError>(x).flat_map(move |v| effect::succeed(v.wrapping_add(k))),
        );
        prop_assert_eq!(via_map.ok(), via_flat_map.ok());
    }

    #[test]
    fn prop_cancellation_is_monotonic(depth in 0u32..20) {
        let root = ExecutionContext::root();
        let mut ctx = root.child();
        for _ in 0..depth {
            ctx = ctx.child();
        }
        prop_assert!(!ctx.is_cancelled());
        ctx.cancel();
        prop_assert!(ctx.is_cancelled());

        let descendant = ctx.child();
        prop_assert!(descendant.is_cancelled());
    }
}

#[tokio::test]
async fn generated_failure_always_surfaces_as_err() {
    let result = Runtime::new()
        .run(effect::fail::<i32, AnyError>(AnyError::HostError("boom".to_string())))
        .await;
    assert!(result.is_err());
}
