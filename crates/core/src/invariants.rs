//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use std::collections::HashSet;

use crate::assignment::SeatingAssignment;
use crate::registry::GuestRegistry;
use crate::topology::ZoneTopology;

/// A guest name appears in at most one zone
pub fn assert_no_duplicate_placements(assignment: &SeatingAssignment) {
    let mut seen = HashSet::new();
    for name in assignment.names() {
        debug_assert!(seen.insert(name), "Guest {:?} is placed in more than one zone", name);
    }
}

/// Placed guests and registered guests are the same set
pub fn assert_placements_match_registry(assignment: &SeatingAssignment, registry: &GuestRegistry) {
    let placed: HashSet<&str> = assignment.names().collect();
    let registered: HashSet<&str> = registry.guests().map(|g| g.name.as_str()).collect();

    debug_assert!(
        placed.is_subset(&registered),
        "Phantom guests placed: {:?}",
        placed.difference(&registered).collect::<Vec<_>>()
    );
    debug_assert!(
        registered.is_subset(&placed),
        "Registered guests missing from every zone: {:?}",
        registered.difference(&placed).collect::<Vec<_>>()
    );
}

/// No table holds more guests than its capacity
///
/// Only holds after local edits; remote snapshots are accepted as-is.
pub fn assert_within_capacity(assignment: &SeatingAssignment, topology: &ZoneTopology) {
    for zone in topology.tables() {
        let occupied = assignment.count_by_zone(&zone.id);
        debug_assert!(
            zone.capacity.limit().map_or(true, |max| occupied <= max),
            "Table {} holds {} guests, capacity {}",
            zone.id,
            occupied,
            zone.capacity
        );
    }
}

/// Placement invariants that hold in every reachable state
pub fn assert_board_invariants(assignment: &SeatingAssignment, registry: &GuestRegistry) {
    assert_no_duplicate_placements(assignment);
    assert_placements_match_registry(assignment, registry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;
    use crate::ordering::PinnedSet;
    use crate::topology::BoardConfig;

    #[test]
    fn test_consistent_board() {
        let topology = ZoneTopology::from_config(&BoardConfig::default()).unwrap();
        let mut registry = GuestRegistry::new(PinnedSet::default());
        registry.add(Side::Groom, "Alice");
        let mut assignment = SeatingAssignment::new(&topology);
        assignment.replace_all(&Default::default(), &topology, &registry);

        assert_board_invariants(&assignment, &registry);
        assert_within_capacity(&assignment, &topology);
    }

    #[test]
    #[should_panic(expected = "more than one zone")]
    fn test_duplicate_placement_detected() {
        let topology = ZoneTopology::from_config(&BoardConfig::default()).unwrap();
        let mut assignment = SeatingAssignment::new(&topology);
        assignment.push_unchecked("table-1", "Alice");
        assignment.push_unchecked("table-2", "Alice");
        assert_no_duplicate_placements(&assignment);
    }

    #[test]
    #[should_panic(expected = "missing from every zone")]
    fn test_lost_guest_detected() {
        let topology = ZoneTopology::from_config(&BoardConfig::default()).unwrap();
        let mut registry = GuestRegistry::new(PinnedSet::default());
        registry.add(Side::Bride, "Bea");
        let assignment = SeatingAssignment::new(&topology);
        assert_placements_match_registry(&assignment, &registry);
    }
}
