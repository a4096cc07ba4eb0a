//! Invocation interposition between the hosting framework and a behavior
//! double.
//!
//! Behavior-double frameworks surface invocation failures through generic
//! dispatch, which loses the failure's type identity. [`InvocationProxy`]
//! restores it for the one case callers must be able to rely on — a
//! [`ProtocolFault`] injected on purpose passes through unchanged — and
//! normalizes everything else into an [`InvocationFailure`] carrying the
//! original as its cause, so the hosting framework never tries a
//! protocol-specific interpretation of an unrelated error.

use std::error::Error as StdError;
use std::fmt;

use crate::fault::ProtocolFault;

/// Error type a behavior double may fail with: anything.
pub type BehaviorError = Box<dyn StdError + Send + Sync>;

/// The capability contract every behavior double implements.
///
/// One method stands in for the whole service contract: the hosting
/// framework names the operation and passes the decoded request payload;
/// the double answers with a response payload or fails.
pub trait ServiceBehavior {
    /// Handles one invocation of `operation` with the given payload.
    ///
    /// # Errors
    ///
    /// A [`ProtocolFault`] to inject a typed wire-level fault; any other
    /// error to signal an unexpected failure inside the double.
    fn invoke(&mut self, operation: &str, payload: &[u8]) -> Result<Vec<u8>, BehaviorError>;
}

impl ServiceBehavior for Box<dyn ServiceBehavior> {
    fn invoke(&mut self, operation: &str, payload: &[u8]) -> Result<Vec<u8>, BehaviorError> {
        (**self).invoke(operation, payload)
    }
}

/// Wrapper that forwards invocations and reclassifies failures.
///
/// # Examples
///
/// ```
/// use portside::fault::ProtocolFault;
/// use portside::proxy::{InvocationProxy, ServiceBehavior};
///
/// struct Faulty;
/// impl ServiceBehavior for Faulty {
///     fn invoke(&mut self, _: &str, _: &[u8]) -> Result<Vec<u8>, portside::proxy::BehaviorError> {
///         Err(Box::new(ProtocolFault::receiver("injected")))
///     }
/// }
///
/// let mut proxy = InvocationProxy::new(Box::new(Faulty));
/// let err = proxy.invoke("op", b"").unwrap_err();
/// // The injected fault keeps its type identity through the proxy.
/// assert!(err.downcast_ref::<ProtocolFault>().is_some());
/// ```
pub struct InvocationProxy {
    target: Box<dyn ServiceBehavior>,
}

impl InvocationProxy {
    /// Wraps a target behavior.
    #[must_use]
    pub fn new(target: Box<dyn ServiceBehavior>) -> Self {
        Self { target }
    }
}

impl ServiceBehavior for InvocationProxy {
    fn invoke(&mut self, operation: &str, payload: &[u8]) -> Result<Vec<u8>, BehaviorError> {
        match self.target.invoke(operation, payload) {
            Ok(response) => Ok(response),
            Err(err) => match err.downcast::<ProtocolFault>() {
                // Intentional fault injection: re-raise unchanged.
                Ok(fault) => Err(fault),
                Err(other) => Err(Box::new(InvocationFailure::new(other))),
            },
        }
    }
}

impl fmt::Debug for InvocationProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationProxy").finish_non_exhaustive()
    }
}

/// Generic runtime failure wrapping an unrecognized error from a behavior
/// double, preserving the original message and cause for diagnostics.
#[derive(Debug)]
pub struct InvocationFailure {
    message: String,
    source: BehaviorError,
}

impl InvocationFailure {
    fn new(source: BehaviorError) -> Self {
        Self {
            message: source.to_string(),
            source,
        }
    }

    /// The original failure's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for InvocationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service invocation failed: {}", self.message)
    }
}

impl StdError for InvocationFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.source.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::{FaultCode, ProtocolFault};

    struct Scripted<F>(F);

    impl<F> ServiceBehavior for Scripted<F>
    where
        F: FnMut(&str, &[u8]) -> Result<Vec<u8>, BehaviorError>,
    {
        fn invoke(&mut self, operation: &str, payload: &[u8]) -> Result<Vec<u8>, BehaviorError> {
            (self.0)(operation, payload)
        }
    }

    #[test]
    fn test_success_passes_through_unchanged() {
        let mut proxy = InvocationProxy::new(Box::new(Scripted(|op: &str, payload: &[u8]| {
            assert_eq!(op, "echo");
            Ok(payload.to_vec())
        })));

        let response = proxy.invoke("echo", b"hello").unwrap();
        assert_eq!(response, b"hello");
    }

    #[test]
    fn test_protocol_fault_keeps_type_identity() {
        let mut proxy = InvocationProxy::new(Box::new(Scripted(|_: &str, _: &[u8]| {
            Err(Box::new(ProtocolFault::receiver("injected").with_detail("<d/>")) as BehaviorError)
        })));

        let err = proxy.invoke("op", b"").unwrap_err();
        let fault = err
            .downcast_ref::<ProtocolFault>()
            .expect("fault should survive the proxy untouched");
        assert_eq!(fault.code(), FaultCode::Receiver);
        assert_eq!(fault.message(), "injected");
        assert_eq!(fault.detail(), Some("<d/>"));
    }

    #[test]
    fn test_unrelated_error_is_wrapped_with_cause() {
        let mut proxy = InvocationProxy::new(Box::new(Scripted(|_: &str, _: &[u8]| {
            Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                "double blew up",
            )) as BehaviorError)
        })));

        let err = proxy.invoke("op", b"").unwrap_err();
        let failure = err
            .downcast_ref::<InvocationFailure>()
            .expect("unrelated error should be wrapped");
        assert_eq!(failure.message(), "double blew up");

        let cause = failure.source().expect("cause must be preserved");
        assert!(cause.downcast_ref::<std::io::Error>().is_some());
    }

    #[test]
    fn test_arguments_forwarded_unchanged() {
        let mut proxy = InvocationProxy::new(Box::new(Scripted(|op: &str, payload: &[u8]| {
            Ok(format!("{op}:{}", payload.len()).into_bytes())
        })));

        let response = proxy.invoke("getAccounts", &[1, 2, 3]).unwrap();
        assert_eq!(response, b"getAccounts:3");
    }
}
