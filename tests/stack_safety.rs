//! Stack safety: a very deep `flat_map` chain must run in constant native stack, not blow it
//! via recursion.

use millstream::effect::{self, Effect};
use millstream::error::AnyError;
use millstream::runtime::Runtime;

fn deep_chain(depth: u32) -> Effect<u32, AnyError> {
    let mut program = effect::succeed::<u32, AnyError>(0);
    for _ in 0..depth {
        program = program.flat_map(|x| effect::succeed(x + 1));
    }
    program
}

#[tokio::test]
async fn million_deep_flat_map_chain_does_not_overflow() {
    let result = Runtime::new().run(deep_chain(1_000_000)).await;
    assert_eq!(result, Ok(1_000_000));
}

#[tokio::test]
async fn moderately_deep_chain_agrees_with_direct_computation() {
    let result = Runtime::new().run(deep_chain(10_000)).await;
    assert_eq!(result, Ok(10_000));
}
