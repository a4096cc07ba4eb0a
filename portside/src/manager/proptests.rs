//! Property-based tests for the reservation manager.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use proptest::prelude::*;

use super::*;
use crate::probe::MockProbe;
use crate::publish::MemoryPublisher;

/// Manager whose create callback behaves like a real listener: each port
/// can be held by at most one live resource.
fn manager_for(range: PortRange) -> PortReservationManager<u16> {
    let held = Rc::new(RefCell::new(HashSet::new()));

    let create: CreateResource<u16> = {
        let held = Rc::clone(&held);
        Box::new(move |port| {
            if held.borrow_mut().insert(port.value()) {
                Ok(port.value())
            } else {
                Err(format!("port {port} taken").into())
            }
        })
    };
    let release: ReleaseResource<u16> = {
        let held = Rc::clone(&held);
        Box::new(move |value| {
            held.borrow_mut().remove(&value);
        })
    };

    PortReservationManager::new(range, create, release)
        .with_probe(Box::new(MockProbe::empty()))
        .with_publisher(Box::new(MemoryPublisher::default()))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn every_name_gets_a_distinct_in_range_port(
        min in 1u16..=60000,
        span in 0u16..=64,
        count in 1usize..=16,
    ) {
        let max = min.saturating_add(span);
        let range = PortRange::from_bounds(min, max).unwrap();
        prop_assume!(count <= usize::from(range.len()));

        let mut manager = manager_for(range);
        let names: Vec<String> = (0..count).map(|i| format!("slot{i}")).collect();
        manager.add(names.clone()).unwrap();
        manager.start().unwrap();

        let ports = manager.ports();
        prop_assert_eq!(ports.len(), count);

        let mut distinct = HashSet::new();
        for name in &names {
            let port = manager.port(name).unwrap().unwrap();
            prop_assert!(range.contains(port));
            prop_assert!(distinct.insert(port));
        }

        manager.stop();
        for name in &names {
            prop_assert_eq!(manager.port(name).unwrap(), None);
        }
    }

    #[test]
    fn oversubscription_is_rejected(min in 1u16..=60000, span in 0u16..=8) {
        let max = min.saturating_add(span);
        let range = PortRange::from_bounds(min, max).unwrap();
        let mut manager = manager_for(range);

        let too_many: Vec<String> = (0..=usize::from(range.len()))
            .map(|i| format!("slot{i}"))
            .collect();
        let is_capacity_err = matches!(manager.add(too_many), Err(Error::Capacity { .. }));
        prop_assert!(is_capacity_err);
    }
}
