//! Placement rules gating every guest move
//!
//! Rules are checked in a fixed order and the first failure wins:
//! capacity, then side affinity for roster zones. Pin status never
//! overrides either rule. Tables accept guests from both sides.

use std::fmt;

use crate::assignment::SeatingAssignment;
use crate::models::{Guest, Side, Zone};

/// Why a move was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveRejection {
    /// Target table already holds `capacity` guests
    CapacityExceeded { zone: String, capacity: usize },
    /// Guest may not enter the other side's roster zone
    SideAffinity { guest_side: Side, zone: String },
    UnknownGuest(String),
    UnknownZone(String),
    /// Guest is not currently in the zone the move starts from
    NotInZone { name: String, zone: String },
}

impl fmt::Display for MoveRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveRejection::CapacityExceeded { zone, capacity } => {
                write!(f, "{} is full ({} seats)", zone, capacity)
            }
            MoveRejection::SideAffinity { guest_side, zone } => {
                write!(f, "{} guests cannot be moved into {}", guest_side, zone)
            }
            MoveRejection::UnknownGuest(name) => write!(f, "Unknown guest: {}", name),
            MoveRejection::UnknownZone(zone) => write!(f, "Unknown zone: {}", zone),
            MoveRejection::NotInZone { name, zone } => write!(f, "{} is not in {}", name, zone),
        }
    }
}

/// Stateless rule checker
pub struct ConstraintValidator;

impl ConstraintValidator {
    /// Check whether `guest` may be placed into `target`
    pub fn check(
        guest: &Guest,
        target: &Zone,
        assignment: &SeatingAssignment,
    ) -> Result<(), MoveRejection> {
        if target.is_table() {
            let occupied = assignment.count_by_zone(&target.id);
            if target.capacity.is_full(occupied) {
                return Err(MoveRejection::CapacityExceeded {
                    zone: target.id.clone(),
                    capacity: target.capacity.limit().unwrap_or(occupied),
                });
            }
        }

        if let Some(owner) = target.roster_side() {
            if owner != guest.side {
                return Err(MoveRejection::SideAffinity {
                    guest_side: guest.side,
                    zone: target.id.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn can_place(guest: &Guest, target: &Zone, assignment: &SeatingAssignment) -> bool {
        Self::check(guest, target, assignment).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{BoardConfig, ZoneTopology};

    fn topology() -> ZoneTopology {
        ZoneTopology::from_config(&BoardConfig::default()).unwrap()
    }

    fn plan(topology: &ZoneTopology, entries: &[(&str, &[&str])]) -> SeatingAssignment {
        let mut assignment = SeatingAssignment::new(topology);
        for (zone, names) in entries {
            for name in *names {
                assignment.push_unchecked(zone, name);
            }
        }
        assignment
    }

    #[test]
    fn test_full_head_table_rejected() {
        let topology = topology();
        let assignment = plan(&topology, &[("table-head", &["A", "B"])]);
        let guest = Guest::new("C", Side::Groom, false);
        let head = topology.get("table-head").unwrap();

        assert_eq!(
            ConstraintValidator::check(&guest, head, &assignment),
            Err(MoveRejection::CapacityExceeded {
                zone: "table-head".to_string(),
                capacity: 2
            })
        );
    }

    #[test]
    fn test_pinned_guest_cannot_bypass_capacity() {
        let topology = topology();
        let assignment = plan(&topology, &[("table-head", &["A", "B"])]);
        let vip = Guest::new("Manal", Side::Bride, true);
        assert!(!ConstraintValidator::can_place(
            &vip,
            topology.get("table-head").unwrap(),
            &assignment
        ));
    }

    #[test]
    fn test_side_affinity_applies_to_everyone() {
        let topology = topology();
        let assignment = SeatingAssignment::new(&topology);
        let bride_roster = topology.roster_zone(Side::Bride);

        for pinned in [false, true] {
            let guest = Guest::new("G", Side::Groom, pinned);
            assert!(matches!(
                ConstraintValidator::check(&guest, bride_roster, &assignment),
                Err(MoveRejection::SideAffinity { .. })
            ));
        }

        let own = Guest::new("G", Side::Bride, false);
        assert!(ConstraintValidator::can_place(&own, bride_roster, &assignment));
    }

    #[test]
    fn test_mixed_tables_allowed() {
        let topology = topology();
        let assignment = plan(&topology, &[("table-1", &["Groomsman"])]);
        let guest = Guest::new("Bridesmaid", Side::Bride, false);
        assert!(ConstraintValidator::can_place(
            &guest,
            topology.get("table-1").unwrap(),
            &assignment
        ));
    }
}
