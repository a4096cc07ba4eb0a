//! The service-hosting framework interface.
//!
//! portside does not speak any wire protocol itself: opening listeners,
//! binding a behavior double to a contract, and serving requests are the
//! hosting framework's job, consumed through the [`ServiceHost`] trait.
//! [`LoopbackHost`] is the in-memory implementation shipped with the crate:
//! it backs `local://` doubles, and its transports and instances are fully
//! observable, which makes it the hosting double for registry tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::address::Address;
use crate::proxy::{BehaviorError, ServiceBehavior};
use crate::Port;

/// Property key forcing request/response validation against the schema.
pub const SCHEMA_VALIDATION_PROPERTY: &str = "schema-validation-enabled";

/// Property key enabling binary attachment optimization.
pub const MTOM_PROPERTY: &str = "mtom-enabled";

/// Failure reported by the hosting framework.
#[derive(Debug)]
pub struct HostError {
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl HostError {
    /// Creates an error with a message only.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error wrapping an underlying cause.
    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: Box<dyn StdError + Send + Sync>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source),
        }
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for HostError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.source {
            Some(source) => Some(source.as_ref()),
            None => None,
        }
    }
}

/// Everything the hosting framework needs to bind one instance.
///
/// `properties` is a configuration map passed through to the framework;
/// [`SCHEMA_VALIDATION_PROPERTY`] and [`MTOM_PROPERTY`] are recognized,
/// unrecognized keys pass through unvalidated.
pub struct InstanceSpec<'a> {
    /// Name of the service contract the target implements.
    pub contract: &'a str,
    /// The (already proxied) behavior to dispatch invocations to.
    pub target: Box<dyn ServiceBehavior>,
    /// The endpoint address to bind.
    pub address: &'a Address,
    /// Location of the service descriptor document, if any.
    pub descriptor_location: Option<&'a str>,
    /// Schema documents for request validation.
    pub schema_locations: &'a [String],
    /// Framework configuration map.
    pub properties: BTreeMap<String, Value>,
}

impl fmt::Debug for InstanceSpec<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceSpec")
            .field("contract", &self.contract)
            .field("address", &self.address)
            .field("descriptor_location", &self.descriptor_location)
            .field("schema_locations", &self.schema_locations)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// A live instance returned by the hosting framework.
pub trait InstanceHandle {
    /// Makes the instance reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the framework cannot (re)start the instance,
    /// e.g. after it was destroyed.
    fn start(&mut self) -> Result<(), HostError>;

    /// Stops network acceptance without discarding the instance.
    fn stop(&mut self);

    /// Tears the instance down for good.
    fn destroy(&mut self);
}

/// The service-hosting framework, consumed but never implemented here
/// beyond the in-memory loopback.
///
/// Implementations are cheap handles: the registry clones them into the
/// reservation manager's resource callbacks.
pub trait ServiceHost {
    /// A live listener/destination opened for a reserved port.
    type Transport;
    /// A published service instance.
    type Instance: InstanceHandle;

    /// Opens a transport-level resource on `port`.
    ///
    /// # Errors
    ///
    /// Fails if the port cannot be bound — including the race where
    /// another process took it after the caller's availability probe.
    fn open_transport(&self, port: Port) -> Result<Self::Transport, HostError>;

    /// Closes a transport. Once this returns the port is free for reuse.
    fn close_transport(&self, transport: Self::Transport);

    /// Binds a proxied target to a contract and address.
    ///
    /// When `shared` is given, the instance attaches to that already-open
    /// transport instead of opening its own; several instances may then
    /// share one listener, distinguished by the path they carry.
    ///
    /// The returned instance is not yet started.
    ///
    /// # Errors
    ///
    /// Fails if the framework rejects the binding.
    fn create_instance(
        &self,
        spec: InstanceSpec<'_>,
        shared: Option<&Self::Transport>,
    ) -> Result<Self::Instance, HostError>;
}

/// In-memory hosting framework.
///
/// Clones share state. Ports can be pre-occupied to force the reservation
/// scan into its retry path, and open transports are observable, so this
/// doubles as the test implementation of [`ServiceHost`].
///
/// # Examples
///
/// ```
/// use portside::host::{LoopbackHost, ServiceHost};
/// use portside::Port;
///
/// let host = LoopbackHost::default();
/// let port = Port::try_from(40100).unwrap();
///
/// let transport = host.open_transport(port).unwrap();
/// assert!(host.open_transport(port).is_err());
///
/// host.close_transport(transport);
/// assert!(host.open_transport(port).is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoopbackHost {
    state: Rc<RefCell<LoopbackState>>,
}

#[derive(Debug, Default)]
struct LoopbackState {
    open: BTreeSet<u16>,
    occupied: BTreeSet<u16>,
}

impl LoopbackHost {
    /// Marks a port as taken by "someone else": opening a transport on it
    /// will fail until [`Self::vacate`] is called.
    pub fn occupy(&self, port: Port) {
        self.state.borrow_mut().occupied.insert(port.value());
    }

    /// Removes an [`occupy`](Self::occupy) marker.
    pub fn vacate(&self, port: Port) {
        self.state.borrow_mut().occupied.remove(&port.value());
    }

    /// Ports with a currently open transport.
    #[must_use]
    pub fn open_ports(&self) -> Vec<u16> {
        self.state.borrow().open.iter().copied().collect()
    }
}

impl ServiceHost for LoopbackHost {
    type Transport = LoopbackTransport;
    type Instance = LoopbackInstance;

    fn open_transport(&self, port: Port) -> Result<Self::Transport, HostError> {
        let mut state = self.state.borrow_mut();
        if state.occupied.contains(&port.value()) || !state.open.insert(port.value()) {
            return Err(HostError::new(format!("port {port} is already bound")));
        }
        Ok(LoopbackTransport { port })
    }

    fn close_transport(&self, transport: Self::Transport) {
        self.state.borrow_mut().open.remove(&transport.port.value());
    }

    fn create_instance(
        &self,
        spec: InstanceSpec<'_>,
        shared: Option<&Self::Transport>,
    ) -> Result<Self::Instance, HostError> {
        if spec.contract.is_empty() {
            return Err(HostError::new("contract name must not be empty"));
        }
        Ok(LoopbackInstance {
            contract: spec.contract.to_string(),
            address: spec.address.as_str().to_string(),
            properties: spec.properties,
            shared_port: shared.map(|transport| transport.port),
            target: spec.target,
            running: false,
            destroyed: false,
        })
    }
}

/// An open loopback "listener".
#[derive(Debug)]
pub struct LoopbackTransport {
    port: Port,
}

impl LoopbackTransport {
    /// The port this transport is bound to.
    #[must_use]
    pub fn port(&self) -> Port {
        self.port
    }
}

/// A published loopback instance.
///
/// Tests drive it directly with [`call`](Self::call) to observe
/// reachability across stop/start cycles.
pub struct LoopbackInstance {
    contract: String,
    address: String,
    properties: BTreeMap<String, Value>,
    shared_port: Option<Port>,
    target: Box<dyn ServiceBehavior>,
    running: bool,
    destroyed: bool,
}

impl LoopbackInstance {
    /// Dispatches one invocation to the hosted behavior.
    ///
    /// # Errors
    ///
    /// Fails if the instance is not currently running, or with whatever
    /// the behavior (as seen through its proxy) fails with.
    pub fn call(&mut self, operation: &str, payload: &[u8]) -> Result<Vec<u8>, BehaviorError> {
        if !self.running {
            return Err(Box::new(HostError::new(format!(
                "instance at {} is not running",
                self.address
            ))));
        }
        self.target.invoke(operation, payload)
    }

    /// The contract name the instance was created with.
    #[must_use]
    pub fn contract(&self) -> &str {
        &self.contract
    }

    /// The framework configuration map the instance was created with.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// The shared transport's port, when the instance was attached to one.
    #[must_use]
    pub fn shared_port(&self) -> Option<Port> {
        self.shared_port
    }

    /// Returns `true` while the instance accepts invocations.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl fmt::Debug for LoopbackInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackInstance")
            .field("contract", &self.contract)
            .field("address", &self.address)
            .field("shared_port", &self.shared_port)
            .field("running", &self.running)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl InstanceHandle for LoopbackInstance {
    fn start(&mut self) -> Result<(), HostError> {
        if self.destroyed {
            return Err(HostError::new(format!(
                "instance at {} was destroyed",
                self.address
            )));
        }
        self.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn destroy(&mut self) {
        self.running = false;
        self.destroyed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::create_double;

    fn spec<'a>(contract: &'a str, address: &'a Address) -> InstanceSpec<'a> {
        InstanceSpec {
            contract,
            target: create_double(),
            address,
            descriptor_location: None,
            schema_locations: &[],
            properties: BTreeMap::new(),
        }
    }

    #[test]
    fn test_transport_open_close_cycle() {
        let host = LoopbackHost::default();
        let port = Port::try_from(41000).unwrap();

        let transport = host.open_transport(port).unwrap();
        assert_eq!(host.open_ports(), vec![41000]);
        assert!(host.open_transport(port).is_err());

        host.close_transport(transport);
        assert!(host.open_ports().is_empty());
        assert!(host.open_transport(port).is_ok());
    }

    #[test]
    fn test_occupied_port_rejects_transport() {
        let host = LoopbackHost::default();
        let port = Port::try_from(41000).unwrap();

        host.occupy(port);
        assert!(host.open_transport(port).is_err());

        host.vacate(port);
        assert!(host.open_transport(port).is_ok());
    }

    #[test]
    fn test_clones_share_state() {
        let host = LoopbackHost::default();
        let clone = host.clone();
        let port = Port::try_from(41000).unwrap();

        let _transport = host.open_transport(port).unwrap();
        assert!(clone.open_transport(port).is_err());
    }

    #[test]
    fn test_instance_lifecycle() {
        let host = LoopbackHost::default();
        let address = Address::parse("local://svc").unwrap();

        let mut instance = host.create_instance(spec("Contract", &address), None).unwrap();
        assert!(!instance.is_running());
        assert!(instance.call("op", b"").is_err());

        instance.start().unwrap();
        assert!(instance.is_running());
        assert!(instance.call("op", b"").is_ok());

        instance.stop();
        assert!(instance.call("op", b"").is_err());

        instance.start().unwrap();
        assert!(instance.call("op", b"").is_ok());

        instance.destroy();
        assert!(instance.start().is_err());
    }

    #[test]
    fn test_instance_records_shared_transport() {
        let host = LoopbackHost::default();
        let address = Address::parse("http://localhost:41000/svc").unwrap();
        let port = Port::try_from(41000).unwrap();

        let transport = host.open_transport(port).unwrap();
        let instance = host
            .create_instance(spec("Contract", &address), Some(&transport))
            .unwrap();
        assert_eq!(instance.shared_port(), Some(port));
    }

    #[test]
    fn test_empty_contract_rejected() {
        let host = LoopbackHost::default();
        let address = Address::parse("local://svc").unwrap();
        assert!(host.create_instance(spec("", &address), None).is_err());
    }

    #[test]
    fn test_host_error_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use");
        let err = HostError::with_source("bind failed", Box::new(io));
        assert_eq!(format!("{err}"), "bind failed");
        assert!(err.source().is_some());
    }
}
