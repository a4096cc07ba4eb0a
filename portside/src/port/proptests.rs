//! Property-based tests for `Port` and `PortRange`.

use proptest::prelude::*;

use super::{Port, PortRange};

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 2000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn nonzero_ports_are_valid(value in 1u16..=65535) {
        let port = Port::try_from(value);
        prop_assert!(port.is_ok());
        prop_assert_eq!(port.unwrap().value(), value);
    }

    #[test]
    fn range_len_matches_bounds(min in 1u16..=60000, span in 0u16..=5000) {
        let max = min.saturating_add(span);
        let range = PortRange::from_bounds(min, max).unwrap();
        prop_assert_eq!(u32::from(range.len()), u32::from(max - min) + 1);
    }

    #[test]
    fn cycle_is_a_permutation(min in 1u16..=60000, span in 0u16..=500, offset in 0u16..=2000) {
        let max = min.saturating_add(span);
        let range = PortRange::from_bounds(min, max).unwrap();

        let mut visited: Vec<u16> = range.cycle_from(offset).map(Port::value).collect();
        visited.sort_unstable();
        visited.dedup();

        // Every port of the range, each exactly once.
        prop_assert_eq!(visited.len(), usize::from(range.len()));
        prop_assert!(range.cycle_from(offset).all(|p| range.contains(p)));
    }

    #[test]
    fn cycle_starts_at_offset(min in 1u16..=60000, span in 0u16..=500, offset in 0u16..=500) {
        let max = min.saturating_add(span);
        let range = PortRange::from_bounds(min, max).unwrap();

        let first = range.cycle_from(offset).next().unwrap();
        let expected =
            u32::from(min) + (u32::from(offset) % u32::from(range.len()));
        prop_assert_eq!(u32::from(first.value()), expected);
    }
}
