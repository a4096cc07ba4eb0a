//! Named port reservation with retry against allocation races.
//!
//! [`PortReservationManager`] owns a fixed set of named slots and a port
//! range. Starting the manager reserves one free port per slot by scanning
//! the range in cyclic order from a random offset: each candidate is
//! bind-probed first, then handed to the caller-supplied resource-creation
//! callback. The probe is advisory — another process can grab the port in
//! between — so a creation failure just advances the scan to the next
//! candidate. Reserved ports are published under their slot names as
//! process-wide configuration until released.

use std::collections::BTreeMap;
use std::fmt;

use log::debug;
use rand::Rng;

use crate::error::{Error, Result};
use crate::probe::{PortProbe, TcpProbe};
use crate::publish::{EnvPublisher, PortPublisher};
use crate::{Port, PortRange};

/// Error type produced by a resource-creation callback.
///
/// Anything the callback can fail with; every failure is treated as "this
/// candidate is gone, try the next one".
pub type ResourceError = Box<dyn std::error::Error + Send + Sync>;

/// Callback that turns a candidate port into a live resource.
pub type CreateResource<T> = Box<dyn FnMut(Port) -> std::result::Result<T, ResourceError>>;

/// Callback that releases a resource. Once it returns, the port it was
/// bound to is assumed free for reuse.
pub type ReleaseResource<T> = Box<dyn FnMut(T)>;

/// A named reservation request tracked by the manager.
///
/// A slot's name never changes; its `(port, resource)` pair is bound and
/// cleared together, so a slot either holds both or neither.
pub struct PortSlot<T> {
    name: String,
    reservation: Option<(Port, T)>,
}

impl<T> PortSlot<T> {
    fn new(name: String) -> Self {
        Self {
            name,
            reservation: None,
        }
    }

    /// The slot's name, used as the externally visible configuration key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The currently reserved port, if any.
    #[must_use]
    pub fn port(&self) -> Option<Port> {
        self.reservation.as_ref().map(|(port, _)| *port)
    }

    /// Returns `true` if the slot currently holds a reservation.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.reservation.is_some()
    }
}

impl<T> fmt::Debug for PortSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortSlot")
            .field("name", &self.name)
            .field("port", &self.port())
            .finish()
    }
}

/// Allocates, tracks, and releases TCP ports for a fixed set of named
/// slots, retrying transient allocation races.
///
/// The manager is generic over the resource type `T` and over how a
/// candidate port becomes a live resource: both strategies are supplied as
/// function values at construction. The default probe bind-tests real
/// localhost ports and the default publisher writes real environment
/// variables; tests swap in [`MockProbe`](crate::probe::MockProbe) and
/// [`MemoryPublisher`](crate::publish::MemoryPublisher).
///
/// # Examples
///
/// ```
/// use portside::manager::PortReservationManager;
/// use portside::publish::MemoryPublisher;
/// use portside::PortRange;
///
/// let range = PortRange::from_bounds(41000, 41010).unwrap();
/// let mut manager = PortReservationManager::new(
///     range,
///     Box::new(|port| {
///         std::net::TcpListener::bind(("127.0.0.1", port.value()))
///             .map_err(Into::into)
///     }),
///     Box::new(drop),
/// )
/// .with_publisher(Box::new(MemoryPublisher::default()));
///
/// manager.add(["myPort"]).unwrap();
/// manager.start().unwrap();
/// assert!(manager.port("myPort").unwrap().is_some());
/// manager.stop();
/// ```
pub struct PortReservationManager<T> {
    range: PortRange,
    slots: Vec<PortSlot<T>>,
    probe: Box<dyn PortProbe>,
    publisher: Box<dyn PortPublisher>,
    create: CreateResource<T>,
    release: ReleaseResource<T>,
}

impl<T> PortReservationManager<T> {
    /// Creates a manager over `range` with the given resource callbacks,
    /// the real TCP probe, and the environment-variable publisher.
    #[must_use]
    pub fn new(range: PortRange, create: CreateResource<T>, release: ReleaseResource<T>) -> Self {
        Self {
            range,
            slots: Vec::new(),
            probe: Box::new(TcpProbe),
            publisher: Box::new(EnvPublisher),
            create,
            release,
        }
    }

    /// Replaces the availability probe.
    #[must_use]
    pub fn with_probe(mut self, probe: Box<dyn PortProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Replaces the configuration publisher.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Box<dyn PortPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// The configured candidate range.
    #[must_use]
    pub fn range(&self) -> PortRange {
        self.range
    }

    /// Registers named slots to reserve.
    ///
    /// Registration itself touches no network resource; ports are bound by
    /// [`start`](Self::start). Slots reserve in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Capacity`] if the total number of registered names
    /// would exceed the number of candidate ports in the range, and
    /// [`Error::Validation`] if a name is already registered (slot names
    /// are unique within a manager).
    pub fn add<I, S>(&mut self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();

        let capacity = usize::from(self.range.len());
        let total = self.slots.len() + names.len();
        if total > capacity {
            return Err(Error::Capacity {
                requested: total,
                capacity,
                range: self.range,
            });
        }

        for (i, name) in names.iter().enumerate() {
            let clashes_existing = self.slots.iter().any(|slot| slot.name == *name);
            let clashes_batch = names[..i].contains(name);
            if clashes_existing || clashes_batch {
                return Err(Error::Validation {
                    field: "name".into(),
                    message: format!("slot '{name}' is already registered"),
                });
            }
        }

        self.slots.extend(names.into_iter().map(PortSlot::new));
        Ok(())
    }

    /// Reserves every registered, currently-unreserved slot, in
    /// registration order.
    ///
    /// For each slot the range is scanned once, in cyclic order from a
    /// uniformly random offset. A candidate must pass the bind probe and
    /// then survive the creation callback; a callback failure (including
    /// the port being taken by another process between probe and creation)
    /// advances the scan. This two-phase check is inherently racy and is
    /// kept correct by retrying, not by locking — no lock would bind
    /// unrelated processes anyway.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PortExhausted`] naming the slot if a full scan of
    /// the range produces no reservation. Slots reserved earlier in the
    /// same call keep their reservations; release them with
    /// [`stop`](Self::stop).
    pub fn start(&mut self) -> Result<()> {
        for idx in 0..self.slots.len() {
            if self.slots[idx].is_reserved() {
                continue;
            }
            self.reserve_slot(idx)?;
        }
        Ok(())
    }

    fn reserve_slot(&mut self, idx: usize) -> Result<()> {
        let offset = rand::thread_rng().gen_range(0..self.range.len());

        for candidate in self.range.cycle_from(offset) {
            if !self.probe.is_free(candidate) {
                continue;
            }
            // The port may be taken between the probe and this call.
            match (self.create)(candidate) {
                Ok(resource) => {
                    let slot = &mut self.slots[idx];
                    slot.reservation = Some((candidate, resource));
                    self.publisher.publish(&slot.name, candidate);
                    debug!("reserved port {candidate} for slot '{}'", slot.name);
                    return Ok(());
                }
                Err(err) => {
                    debug!("candidate port {candidate} lost after probe: {err}");
                }
            }
        }

        Err(Error::PortExhausted {
            slot: self.slots[idx].name.clone(),
            range: self.range,
        })
    }

    /// Releases every currently-reserved slot: the release callback runs
    /// with the slot's resource, the published configuration entry is
    /// cleared, and the slot returns to the unreserved state.
    ///
    /// Idempotent — releasing an already-unreserved slot is a no-op, and a
    /// stopped manager can be started again.
    pub fn stop(&mut self) {
        for slot in &mut self.slots {
            if let Some((port, resource)) = slot.reservation.take() {
                (self.release)(resource);
                self.publisher.clear(&slot.name);
                debug!("released port {port} for slot '{}'", slot.name);
            }
        }
    }

    /// Returns the reserved port for `name`, or `None` if the slot is
    /// registered but currently unreserved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SlotNotFound`] if `name` was never registered —
    /// distinct from "registered but unreserved".
    pub fn port(&self, name: &str) -> Result<Option<Port>> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .map(PortSlot::port)
            .ok_or_else(|| Error::SlotNotFound {
                name: name.to_string(),
            })
    }

    /// Returns every registered name mapped to its current port (`None` if
    /// unreserved).
    #[must_use]
    pub fn ports(&self) -> BTreeMap<String, Option<Port>> {
        self.slots
            .iter()
            .map(|slot| (slot.name.clone(), slot.port()))
            .collect()
    }

    /// Returns the resource bound to a currently-reserved port, if any.
    #[must_use]
    pub fn data(&self, port: Port) -> Option<&T> {
        self.slots.iter().find_map(|slot| match &slot.reservation {
            Some((reserved, resource)) if *reserved == port => Some(resource),
            _ => None,
        })
    }

    /// Registered slot names, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(PortSlot::name)
    }
}

impl<T> fmt::Debug for PortReservationManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortReservationManager")
            .field("range", &self.range)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod proptests;
