//! An in-memory capability handler for tests, so test code interpreting effects never needs to
//! hand-roll a mock.
//!
//! Composes a test environment's dependencies without a real backend, adapted to this crate's
//! capability/handler seam rather than a constructor-injection tuple, since here the thing under
//! test receives its environment by performing capabilities, not by taking arguments.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::capability::{Capability, CapabilityHandler, Outcome};

/// Append `message` to the recorder's log.
#[derive(Debug, Clone)]
pub struct Log(pub String);

impl Capability for Log {
    type Result = ();
}

/// Store `value` under `key` in the recorder's table.
#[derive(Debug, Clone)]
pub struct Set {
    pub key: String,
    pub value: String,
}

impl Capability for Set {
    type Result = ();
}

/// Read the value stored under `key`, if any.
#[derive(Debug, Clone)]
pub struct Get(pub String);

impl Capability for Get {
    type Result = Option<String>;
}

/// A handler that answers [`Log`], [`Set`], and [`Get`] against in-memory state, for tests that
/// want a real (if trivial) capability backend instead of a mock written per test.
#[derive(Debug, Default)]
pub struct Recorder {
    log: Mutex<Vec<String>>,
    store: Mutex<HashMap<String, String>>,
}

impl Recorder {
    /// A recorder with an empty log and an empty table.
    pub fn new() -> Self {
        Recorder::default()
    }

    /// The messages recorded so far, in the order `Log` was performed.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// The current value stored under `key`, outside of performing a [`Get`].
    pub fn peek(&self, key: &str) -> Option<String> {
        self.store.lock().unwrap().get(key).cloned()
    }
}

impl CapabilityHandler for Recorder {
    fn handle(&self, capability: &dyn Any) -> Outcome {
        if let Some(Log(message)) = capability.downcast_ref::<Log>() {
            self.log.lock().unwrap().push(message.clone());
            return Outcome::Handled(Box::new(()));
        }
        if let Some(Set { key, value }) = capability.downcast_ref::<Set>() {
            self.store.lock().unwrap().insert(key.clone(), value.clone());
            return Outcome::Handled(Box::new(()));
        }
        if let Some(Get(key)) = capability.downcast_ref::<Get>() {
            let value = self.store.lock().unwrap().get(key).cloned();
            return Outcome::Handled(Box::new(value));
        }
        Outcome::NotMine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityHandlerExt;

    #[test]
    fn records_logs_in_order() {
        let recorder = Recorder::new();
        recorder.handle(&Log("start".to_string()));
        recorder.handle(&Log("done".to_string()));
        assert_eq!(recorder.log(), vec!["start", "done"]);
    }

    #[test]
    fn set_then_get_round_trips() {
        let recorder = Recorder::new();
        recorder.handle(&Set {
            key: "name".to_string(),
            value: "Alice".to_string(),
        });
        match recorder.handle(&Get("name".to_string())) {
            Outcome::Handled(boxed) => {
                let value = *boxed.downcast::<Option<String>>().unwrap();
                assert_eq!(value, Some("Alice".to_string()));
            }
            _ => panic!("expected Handled"),
        }
    }

    #[test]
    fn rejects_unknown_capabilities() {
        struct Unknown;
        let recorder = Recorder::new();
        assert!(matches!(recorder.handle(&Unknown), Outcome::NotMine));
    }

    #[test]
    fn composes_with_fallback() {
        struct Always;
        impl CapabilityHandler for Always {
            fn handle(&self, _capability: &dyn Any) -> Outcome {
                Outcome::Handled(Box::new(()))
            }
        }

        struct Unhandled;
        let chained = Recorder::new().or_else(Always);
        assert!(matches!(chained.handle(&Unhandled), Outcome::Handled(_)));
    }
}
