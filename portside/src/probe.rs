//! Local port availability probing.
//!
//! The probe answers one question cheaply: can a throwaway listener bind
//! this port on localhost right now? It is advisory only. Another process
//! can take the port between the probe and the actual transport creation,
//! so callers must treat a later creation failure as retryable rather than
//! relying on the probe being authoritative.

use std::collections::HashSet;

use crate::Port;

/// Trait for checking whether a candidate port is currently bindable.
///
/// The trait seam exists so the reservation scan can be tested
/// deterministically; production code uses [`TcpProbe`].
pub trait PortProbe {
    /// Returns `true` if a throwaway listener could bind the port just now.
    fn is_free(&self, port: Port) -> bool;
}

/// Production probe: bind-tests a throwaway listener on localhost.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

impl PortProbe for TcpProbe {
    fn is_free(&self, port: Port) -> bool {
        port_selector::is_free_tcp(port.value())
    }
}

/// Deterministic probe for tests, answering from a fixed busy set.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use portside::probe::{MockProbe, PortProbe};
/// use portside::Port;
///
/// let mut busy = HashSet::new();
/// busy.insert(Port::try_from(8080).unwrap());
///
/// let probe = MockProbe::new(busy);
/// assert!(!probe.is_free(Port::try_from(8080).unwrap()));
/// assert!(probe.is_free(Port::try_from(8081).unwrap()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    busy: HashSet<Port>,
}

impl MockProbe {
    /// Create a probe that reports the given ports as busy.
    #[must_use]
    pub fn new(busy: HashSet<Port>) -> Self {
        Self { busy }
    }

    /// Create a probe that reports every port as free.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

impl PortProbe for MockProbe {
    fn is_free(&self, port: Port) -> bool {
        !self.busy.contains(&port)
    }
}

/// Convenience bind-test of a single port on localhost.
///
/// Equivalent to asking [`TcpProbe`]; useful in teardown assertions to
/// check that a released port is bindable again.
#[must_use]
pub fn is_port_available(port: Port) -> bool {
    TcpProbe.is_free(port)
}
