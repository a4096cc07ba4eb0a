//! Typed protocol-level faults.
//!
//! A [`ProtocolFault`] is a failure a test deliberately injects into a
//! behavior double and expects to reach the caller across the wire boundary
//! with its type intact. The invocation proxy recognizes this one type and
//! passes it through unchanged; every other failure is wrapped. Rendering a
//! fault into a wire payload is the hosting framework's job, not ours.

use std::fmt;

use thiserror::Error;

/// Which side of the exchange a fault blames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCode {
    /// The request was at fault.
    Sender,
    /// The service failed to process a valid request.
    Receiver,
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sender => write!(f, "sender"),
            Self::Receiver => write!(f, "receiver"),
        }
    }
}

/// A recognized, typed failure meant for delivery to the remote caller.
///
/// # Examples
///
/// ```
/// use portside::fault::{FaultCode, ProtocolFault};
///
/// let fault = ProtocolFault::receiver("boom").with_detail("<detail/>");
/// assert_eq!(fault.code(), FaultCode::Receiver);
/// assert_eq!(fault.detail(), Some("<detail/>"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code} fault: {message}")]
pub struct ProtocolFault {
    code: FaultCode,
    message: String,
    detail: Option<String>,
}

impl ProtocolFault {
    /// Creates a fault blaming the request.
    #[must_use]
    pub fn sender(message: impl Into<String>) -> Self {
        Self {
            code: FaultCode::Sender,
            message: message.into(),
            detail: None,
        }
    }

    /// Creates a fault blaming the service.
    #[must_use]
    pub fn receiver(message: impl Into<String>) -> Self {
        Self {
            code: FaultCode::Receiver,
            message: message.into(),
            detail: None,
        }
    }

    /// Attaches a pre-rendered detail payload.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// The fault code.
    #[must_use]
    pub fn code(&self) -> FaultCode {
        self.code
    }

    /// The fault message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The detail payload, if any.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_constructors() {
        let fault = ProtocolFault::sender("bad request");
        assert_eq!(fault.code(), FaultCode::Sender);
        assert_eq!(fault.message(), "bad request");
        assert_eq!(fault.detail(), None);

        let fault = ProtocolFault::receiver("oops");
        assert_eq!(fault.code(), FaultCode::Receiver);
    }

    #[test]
    fn test_fault_detail() {
        let fault = ProtocolFault::receiver("oops").with_detail("<cause/>");
        assert_eq!(fault.detail(), Some("<cause/>"));
    }

    #[test]
    fn test_fault_display() {
        let fault = ProtocolFault::receiver("service exploded");
        let display = format!("{fault}");
        assert!(display.contains("receiver"));
        assert!(display.contains("service exploded"));
    }

    #[test]
    fn test_fault_equality_survives_round_trip() {
        let fault = ProtocolFault::sender("x").with_detail("d");
        assert_eq!(fault.clone(), fault);
    }
}
