//! Behavior doubles for use as publish targets.
//!
//! [`StubBehavior`] is the default no-op double a test publishes before any
//! behavior is configured. [`ScriptedBehavior`] plays back a queue of
//! programmed outcomes and records what it was asked, which covers both
//! happy-path and fault-injection tests.

use std::collections::VecDeque;

use crate::fault::ProtocolFault;
use crate::proxy::{BehaviorError, ServiceBehavior};

/// Default no-op behavior double: answers every invocation with an empty
/// payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubBehavior;

impl ServiceBehavior for StubBehavior {
    fn invoke(&mut self, _operation: &str, _payload: &[u8]) -> Result<Vec<u8>, BehaviorError> {
        Ok(Vec::new())
    }
}

/// Creates a fresh default behavior double, boxed for publishing.
#[must_use]
pub fn create_double() -> Box<dyn ServiceBehavior> {
    Box::new(StubBehavior)
}

/// One programmed outcome of a scripted invocation.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Respond with the given payload.
    Respond(Vec<u8>),
    /// Fail with a typed protocol fault.
    Fault(ProtocolFault),
    /// Fail with an arbitrary error message.
    Error(String),
}

/// Scripted behavior double: plays back programmed outcomes in order and
/// records the operations it was invoked with.
///
/// Once the script runs dry, further invocations answer with an empty
/// payload like [`StubBehavior`].
///
/// # Examples
///
/// ```
/// use portside::mock::{Outcome, ScriptedBehavior};
/// use portside::proxy::ServiceBehavior;
///
/// let mut double = ScriptedBehavior::default();
/// double.push(Outcome::Respond(b"ok".to_vec()));
///
/// assert_eq!(double.invoke("op", b"").unwrap(), b"ok");
/// assert_eq!(double.invocations(), &["op"]);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedBehavior {
    script: VecDeque<Outcome>,
    invocations: Vec<String>,
}

impl ScriptedBehavior {
    /// Appends an outcome to the script.
    pub fn push(&mut self, outcome: Outcome) {
        self.script.push_back(outcome);
    }

    /// Builder-style variant of [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, outcome: Outcome) -> Self {
        self.push(outcome);
        self
    }

    /// Operations this double has been invoked with, in order.
    #[must_use]
    pub fn invocations(&self) -> &[String] {
        &self.invocations
    }
}

impl ServiceBehavior for ScriptedBehavior {
    fn invoke(&mut self, operation: &str, _payload: &[u8]) -> Result<Vec<u8>, BehaviorError> {
        self.invocations.push(operation.to_string());
        match self.script.pop_front() {
            None => Ok(Vec::new()),
            Some(Outcome::Respond(payload)) => Ok(payload),
            Some(Outcome::Fault(fault)) => Err(Box::new(fault)),
            Some(Outcome::Error(message)) => Err(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_answers_empty() {
        let mut stub = StubBehavior;
        assert_eq!(stub.invoke("anything", b"payload").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_create_double_is_noop() {
        let mut double = create_double();
        assert!(double.invoke("op", b"").unwrap().is_empty());
    }

    #[test]
    fn test_scripted_plays_back_in_order() {
        let mut double = ScriptedBehavior::default()
            .with(Outcome::Respond(b"first".to_vec()))
            .with(Outcome::Respond(b"second".to_vec()));

        assert_eq!(double.invoke("a", b"").unwrap(), b"first");
        assert_eq!(double.invoke("b", b"").unwrap(), b"second");
        // Script exhausted: falls back to empty responses.
        assert!(double.invoke("c", b"").unwrap().is_empty());
        assert_eq!(double.invocations(), &["a", "b", "c"]);
    }

    #[test]
    fn test_scripted_fault_outcome() {
        let mut double = ScriptedBehavior::default()
            .with(Outcome::Fault(ProtocolFault::receiver("scripted")));

        let err = double.invoke("op", b"").unwrap_err();
        assert!(err.downcast_ref::<ProtocolFault>().is_some());
    }

    #[test]
    fn test_scripted_error_outcome() {
        let mut double =
            ScriptedBehavior::default().with(Outcome::Error("unexpected".to_string()));

        let err = double.invoke("op", b"").unwrap_err();
        assert!(err.downcast_ref::<ProtocolFault>().is_none());
        assert_eq!(err.to_string(), "unexpected");
    }
}
