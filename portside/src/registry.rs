//! Address-keyed service instance lifecycle, built on port reservation.
//!
//! [`ServiceRegistry`] maps endpoint addresses to running service-double
//! instances created through a [`ServiceHost`]. It enforces one instance
//! per address, wires the embedded [`PortReservationManager`]'s resource
//! callbacks to the host's transport operations, and lets an instance
//! published at a reserved port share the reservation's already-open
//! listener instead of binding a second one.

use std::collections::{BTreeMap, HashMap};

use log::debug;
use serde_json::Value;

use crate::address::Address;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::host::{InstanceHandle, InstanceSpec, ServiceHost, SCHEMA_VALIDATION_PROPERTY};
use crate::manager::{PortReservationManager, ResourceError};
use crate::mock;
use crate::probe::PortProbe;
use crate::proxy::{InvocationProxy, ServiceBehavior};
use crate::publish::PortPublisher;
use crate::{Port, PortRange};

/// Optional arguments to [`ServiceRegistry::publish`].
///
/// # Examples
///
/// ```
/// use portside::registry::PublishOptions;
///
/// let options = PublishOptions::default()
///     .descriptor("classpath:bank.wsdl")
///     .schema("classpath:bank.xsd")
///     .property("mtom-enabled", serde_json::json!(true));
/// ```
#[derive(Debug, Default)]
pub struct PublishOptions {
    /// Location of the service descriptor document.
    pub descriptor_location: Option<String>,
    /// Schema documents for request validation.
    pub schema_locations: Vec<String>,
    /// Framework configuration map, passed through unvalidated.
    pub properties: BTreeMap<String, Value>,
}

impl PublishOptions {
    /// Sets the descriptor document location.
    #[must_use]
    pub fn descriptor(mut self, location: impl Into<String>) -> Self {
        self.descriptor_location = Some(location.into());
        self
    }

    /// Adds a schema document location.
    #[must_use]
    pub fn schema(mut self, location: impl Into<String>) -> Self {
        self.schema_locations.push(location.into());
        self
    }

    /// Adds a framework property.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// Run state of a published instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// The instance accepts invocations.
    Running,
    /// Network acceptance is stopped; the registration survives.
    Stopped,
}

/// One published service double, keyed by its address.
#[derive(Debug)]
pub struct ServiceInstance<I> {
    address: Address,
    handle: I,
    bound_port: Option<Port>,
    state: InstanceState,
}

impl<I> ServiceInstance<I> {
    /// The instance's endpoint address.
    #[must_use]
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The reserved port this instance shares, if it was published on one.
    #[must_use]
    pub fn bound_port(&self) -> Option<Port> {
        self.bound_port
    }

    /// The instance's current run state.
    #[must_use]
    pub fn state(&self) -> InstanceState {
        self.state
    }

    /// The hosting framework's handle.
    #[must_use]
    pub fn handle(&self) -> &I {
        &self.handle
    }

    /// Mutable access to the hosting framework's handle.
    pub fn handle_mut(&mut self) -> &mut I {
        &mut self.handle
    }
}

/// Creates, tracks, starts, stops, and destroys service instances keyed by
/// address, with instance creation optionally bound to reserved ports.
///
/// The usual flow around a test: [`register_ports`](Self::register_ports)
/// the symbolic names, [`reserve_all`](Self::reserve_all) in the setup
/// hook, [`publish`](Self::publish) doubles at concrete addresses, then
/// [`destroy`](Self::destroy) in teardown.
///
/// # Examples
///
/// ```
/// use portside::host::LoopbackHost;
/// use portside::registry::{PublishOptions, ServiceRegistry};
/// use portside::PortRange;
///
/// let range = PortRange::from_bounds(42000, 42010).unwrap();
/// let mut registry = ServiceRegistry::with_range(LoopbackHost::default(), range);
///
/// registry.publish_default("BankContract", "local://bank").unwrap();
/// assert!(registry.is_published("local://bank"));
///
/// registry.destroy();
/// ```
pub struct ServiceRegistry<H: ServiceHost> {
    host: H,
    reservations: PortReservationManager<H::Transport>,
    instances: HashMap<String, ServiceInstance<H::Instance>>,
}

impl<H> ServiceRegistry<H>
where
    H: ServiceHost + Clone + 'static,
    H::Transport: 'static,
{
    /// Creates a registry scanning the default non-privileged port range.
    #[must_use]
    pub fn new(host: H) -> Self {
        Self::with_range(host, PortRange::ephemeral())
    }

    /// Creates a registry reserving ports from `range`.
    #[must_use]
    pub fn with_range(host: H, range: PortRange) -> Self {
        let create = {
            let host = host.clone();
            Box::new(move |port: Port| {
                host.open_transport(port)
                    .map_err(|err| Box::new(err) as ResourceError)
            })
        };
        let release = {
            let host = host.clone();
            Box::new(move |transport: H::Transport| host.close_transport(transport))
        };

        Self {
            reservations: PortReservationManager::new(range, create, release),
            host,
            instances: HashMap::new(),
        }
    }

    /// Creates a registry with the range resolved from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured range is invalid.
    pub fn from_config(host: H, config: &Config) -> Result<Self> {
        Ok(Self::with_range(host, config.port_range()?))
    }

    /// Replaces the reservation manager's availability probe.
    #[must_use]
    pub fn with_probe(mut self, probe: Box<dyn PortProbe>) -> Self {
        self.reservations = self.reservations.with_probe(probe);
        self
    }

    /// Replaces the reservation manager's configuration publisher.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Box<dyn PortPublisher>) -> Self {
        self.reservations = self.reservations.with_publisher(publisher);
        self
    }

    /// Registers named port slots to reserve.
    ///
    /// # Errors
    ///
    /// See [`PortReservationManager::add`].
    pub fn register_ports<I, S>(&mut self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reservations.add(names)
    }

    /// Reserves every registered port slot — the setup-hook trigger.
    ///
    /// # Errors
    ///
    /// See [`PortReservationManager::start`].
    pub fn reserve_all(&mut self) -> Result<()> {
        self.reservations.start()
    }

    /// The reserved port for a slot name.
    ///
    /// # Errors
    ///
    /// See [`PortReservationManager::port`].
    pub fn port(&self, name: &str) -> Result<Option<Port>> {
        self.reservations.port(name)
    }

    /// Every registered slot name mapped to its current port.
    #[must_use]
    pub fn ports(&self) -> BTreeMap<String, Option<Port>> {
        self.reservations.ports()
    }

    /// Publishes a behavior double at `address` and starts it.
    ///
    /// The target is wrapped in an [`InvocationProxy`] before the hosting
    /// framework sees it. A descriptor or schema location forces the
    /// `schema-validation-enabled` property. If the address port matches a
    /// currently reserved port, the instance shares that reservation's
    /// open transport.
    ///
    /// # Errors
    ///
    /// [`Error::MissingArgument`] for an empty `contract` or `address`,
    /// [`Error::InvalidAddress`] unless the address is `local://`,
    /// [`Error::DuplicateAddress`] if an instance already exists there, and
    /// [`Error::Host`] if the framework refuses creation or start.
    pub fn publish(
        &mut self,
        contract: &str,
        target: Box<dyn ServiceBehavior>,
        address: &str,
        options: PublishOptions,
    ) -> Result<()> {
        if contract.trim().is_empty() {
            return Err(Error::MissingArgument { name: "contract" });
        }
        if address.trim().is_empty() {
            return Err(Error::MissingArgument { name: "address" });
        }

        let parsed = Address::parse(address)?;
        if self.instances.contains_key(parsed.as_str()) {
            return Err(Error::DuplicateAddress {
                address: parsed.as_str().to_string(),
            });
        }

        let proxied: Box<dyn ServiceBehavior> = Box::new(InvocationProxy::new(target));

        let mut properties = options.properties;
        if options.descriptor_location.is_some() || !options.schema_locations.is_empty() {
            properties.insert(SCHEMA_VALIDATION_PROPERTY.to_string(), Value::Bool(true));
        }

        let bound_port = parsed
            .port()
            .filter(|port| self.reservations.data(*port).is_some());
        let shared = bound_port.and_then(|port| self.reservations.data(port));

        let spec = InstanceSpec {
            contract,
            target: proxied,
            address: &parsed,
            descriptor_location: options.descriptor_location.as_deref(),
            schema_locations: &options.schema_locations,
            properties,
        };
        let handle = self.host.create_instance(spec, shared)?;

        debug!("publishing instance at {parsed}");
        let key = parsed.as_str().to_string();
        let instance = self.instances.entry(key).or_insert(ServiceInstance {
            address: parsed,
            handle,
            bound_port,
            state: InstanceState::Stopped,
        });
        instance.handle.start()?;
        instance.state = InstanceState::Running;
        Ok(())
    }

    /// Publishes a fresh default no-op double at `address`.
    ///
    /// # Errors
    ///
    /// Same as [`publish`](Self::publish).
    pub fn publish_default(&mut self, contract: &str, address: &str) -> Result<()> {
        self.publish(contract, mock::create_double(), address, PublishOptions::default())
    }

    /// Stops network acceptance of every running instance, keeping all
    /// registrations. Safe to call when nothing is registered.
    pub fn stop(&mut self) {
        for instance in self.instances.values_mut() {
            if instance.state == InstanceState::Running {
                instance.handle.stop();
                instance.state = InstanceState::Stopped;
            }
        }
    }

    /// Restarts every previously-stopped instance.
    ///
    /// Instances are created (and first started) by
    /// [`publish`](Self::publish); this only resumes stopped ones.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error::Host`] a restart fails with; instances
    /// restarted before the failure stay running.
    pub fn start(&mut self) -> Result<()> {
        for instance in self.instances.values_mut() {
            if instance.state == InstanceState::Stopped {
                instance.handle.start()?;
                instance.state = InstanceState::Running;
            }
        }
        Ok(())
    }

    /// Stops and discards every instance, keeping port reservations so a
    /// later [`publish`](Self::publish) can reuse the ports without
    /// another reservation round.
    pub fn clear(&mut self) {
        for (address, mut instance) in self.instances.drain() {
            debug!("discarding instance at {address}");
            instance.handle.stop();
            instance.handle.destroy();
        }
    }

    /// Stops and discards every instance, then releases all port
    /// reservations. Terminal: re-register and re-reserve before reuse.
    pub fn destroy(&mut self) {
        self.clear();
        self.reservations.stop();
    }

    /// Returns `true` if an instance is registered at `address`.
    #[must_use]
    pub fn is_published(&self, address: &str) -> bool {
        self.instances.contains_key(address)
    }

    /// Number of registered instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns `true` if no instance is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// The registered instance at `address`, if any.
    #[must_use]
    pub fn instance(&self, address: &str) -> Option<&ServiceInstance<H::Instance>> {
        self.instances.get(address)
    }

    /// Mutable access to the registered instance at `address`, if any.
    pub fn instance_mut(&mut self, address: &str) -> Option<&mut ServiceInstance<H::Instance>> {
        self.instances.get_mut(address)
    }
}
