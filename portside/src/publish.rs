//! Publication of reserved ports as process-wide configuration.
//!
//! Each reserved slot name is published as a key/value pair so later
//! configuration resolution (address templates like `${myPort}`) can pick
//! the port up. The manager is the sole writer: it sets the value on
//! reservation and clears it on release. Two managers in one process
//! sharing slot names are not supported — last writer wins.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::env;
use std::rc::Rc;

use crate::Port;

/// Destination for published name→port pairs.
///
/// [`EnvPublisher`] writes real process environment variables;
/// [`MemoryPublisher`] captures values in a map so manager tests do not
/// depend on process-global state.
pub trait PortPublisher {
    /// Publish `port` (as its decimal string) under `name`.
    fn publish(&mut self, name: &str, port: Port);

    /// Clear the entry previously published under `name`.
    fn clear(&mut self, name: &str);
}

/// Publisher backed by process environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvPublisher;

impl PortPublisher for EnvPublisher {
    fn publish(&mut self, name: &str, port: Port) {
        env::set_var(name, port.value().to_string());
    }

    fn clear(&mut self, name: &str) {
        env::remove_var(name);
    }
}

/// In-memory publisher for tests.
///
/// Clones share the underlying map, so a test can keep one handle while the
/// manager owns another and still observe what was published.
///
/// # Examples
///
/// ```
/// use portside::publish::{MemoryPublisher, PortPublisher};
/// use portside::Port;
///
/// let observer = MemoryPublisher::default();
/// let mut writer = observer.clone();
///
/// writer.publish("myPort", Port::try_from(8080).unwrap());
/// assert_eq!(observer.get("myPort").as_deref(), Some("8080"));
///
/// writer.clear("myPort");
/// assert_eq!(observer.get("myPort"), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryPublisher {
    values: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryPublisher {
    /// Returns the currently published value for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.values.borrow().get(name).cloned()
    }

    /// Number of currently published entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    /// Returns `true` if nothing is currently published.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }
}

impl PortPublisher for MemoryPublisher {
    fn publish(&mut self, name: &str, port: Port) {
        self.values
            .borrow_mut()
            .insert(name.to_string(), port.value().to_string());
    }

    fn clear(&mut self, name: &str) {
        self.values.borrow_mut().remove(name);
    }
}
