//! Capability dispatch through handlers and generators.

use millstream::capability::{compose, Capability, CapabilityHandler, CapabilityHandlerExt, Outcome};
use millstream::effect::{self, Effect};
use millstream::error::AnyError;
use millstream::runtime::Runtime;
use millstream::testing::{Get, Log, Recorder, Set};
use std::any::Any;
use std::sync::Arc;

struct Ping;
impl Capability for Ping {
    type Result = &'static str;
}

struct Pong;
impl CapabilityHandler for Pong {
    fn handle(&self, capability: &dyn Any) -> Outcome {
        match capability.downcast_ref::<Ping>() {
            Some(_) => Outcome::Handled(Box::new("pong")),
            None => Outcome::NotMine,
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn generator_performs_capabilities_in_sequence() {
    let recorder = Arc::new(Recorder::new());

    let program: Effect<Option<String>, AnyError> = effect::generate(
        |gen_ctx| -> Result<Option<String>, AnyError> {
            gen_ctx.perform(Log("start".to_string()))?;
            gen_ctx.perform(Set {
                key: "name".to_string(),
                value: "Alice".to_string(),
            })?;
            let value = gen_ctx.perform(Get("name".to_string()))?;
            gen_ctx.perform(Log(format!(
                "got: {}",
                value.clone().unwrap_or_default()
            )))?;
            Ok(value)
        },
        recorder.clone(),
    );

    let result = Runtime::new().run(program).await;
    assert_eq!(result, Ok(Some("Alice".to_string())));
    assert_eq!(recorder.log(), vec!["start", "got: Alice"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn nested_performs_reach_the_installed_handler() {
    let program: Effect<&'static str, AnyError> = effect::scoped(|_scope| {
        effect::from(Ping).flat_map(|reply| effect::succeed(reply))
    });

    let result = Runtime::new().run_with_handler(program, Pong).await;
    assert_eq!(result, Ok("pong"));
}

#[tokio::test(flavor = "multi_thread")]
async fn handler_fallback_chain_tries_each_in_order() {
    struct Unhandled;
    impl CapabilityHandler for Unhandled {
        fn handle(&self, _capability: &dyn Any) -> Outcome {
            Outcome::NotMine
        }
    }

    let chained = Unhandled.or_else(Pong);
    let program: Effect<&'static str, AnyError> = effect::from(Ping);
    let result = Runtime::new().run_with_handler(program, chained).await;
    assert_eq!(result, Ok("pong"));
}

#[tokio::test(flavor = "multi_thread")]
async fn compose_tries_a_list_of_handlers_in_order() {
    let handlers: Vec<Arc<dyn CapabilityHandler>> = vec![Arc::new(Recorder::new()), Arc::new(Pong)];
    let composite = compose(handlers);

    let program: Effect<&'static str, AnyError> = effect::from(Ping);
    let result = Runtime::new().run_with_handler(program, composite).await;
    assert_eq!(result, Ok("pong"));
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_handler_surfaces_as_a_typed_error() {
    let program: Effect<&'static str, AnyError> = effect::from(Ping);
    let result = Runtime::new().run(program).await;
    assert!(result.is_err());
}
