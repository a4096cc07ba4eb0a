#![deny(missing_docs, unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! # portside
//!
//! Ephemeral port reservation and service-double lifecycle management for
//! integration tests.
//!
//! Test code that stands in for a remote service needs a named,
//! collision-free TCP port, a running stand-in bound to that port, and a
//! guarantee that teardown leaves neither the port nor the instance
//! behind. portside provides two components for that:
//!
//! - [`PortReservationManager`]: reserves one free port per named slot
//!   from a configured range, retrying transient allocation races, and
//!   publishes each reserved port under its slot name as process-wide
//!   configuration.
//! - [`ServiceRegistry`]: maps endpoint addresses to service instances
//!   created through a [`ServiceHost`], enforcing one instance per
//!   address, with start/stop/clear/destroy acting uniformly across all
//!   of them. Instances published at a reserved port share the
//!   reservation's open listener.
//!
//! Actually speaking a wire protocol is the hosting framework's job; the
//! behavior doubles themselves come from whatever mocking facility the
//! test uses. Both are consumed through narrow traits ([`ServiceHost`],
//! [`ServiceBehavior`]).
//!
//! ## Example
//!
//! ```
//! use portside::host::LoopbackHost;
//! use portside::{PortRange, ServiceRegistry};
//!
//! let range = PortRange::from_bounds(42000, 42099).unwrap();
//! let mut registry = ServiceRegistry::with_range(LoopbackHost::default(), range);
//!
//! registry.register_ports(["bankPort"]).unwrap();
//! registry.reserve_all().unwrap();
//!
//! let port = registry.port("bankPort").unwrap().unwrap();
//! registry
//!     .publish_default("BankContract", &format!("http://localhost:{port}/bank"))
//!     .unwrap();
//!
//! registry.destroy();
//! ```

pub mod address;
pub mod config;
pub mod error;
pub mod fault;
pub mod host;
pub mod manager;
pub mod mock;
pub mod port;
pub mod probe;
pub mod proxy;
pub mod publish;
pub mod registry;

// Re-export key types at crate root for convenience
pub use address::Address;
pub use config::Config;
pub use error::{Error, Result};
pub use fault::{FaultCode, ProtocolFault};
pub use host::{HostError, InstanceHandle, InstanceSpec, LoopbackHost, ServiceHost};
pub use manager::{CreateResource, PortReservationManager, ReleaseResource, ResourceError};
pub use mock::{create_double, ScriptedBehavior, StubBehavior};
pub use port::{Port, PortRange};
pub use probe::{is_port_available, PortProbe};
pub use proxy::{BehaviorError, InvocationFailure, InvocationProxy, ServiceBehavior};
pub use publish::PortPublisher;
pub use registry::{InstanceState, PublishOptions, ServiceInstance, ServiceRegistry};
