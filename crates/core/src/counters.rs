//! Derived board counters

use serde::Serialize;

use crate::assignment::SeatingAssignment;
use crate::models::Side;
use crate::registry::GuestRegistry;
use crate::topology::ZoneTopology;

/// Seats used at one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCounter {
    pub zone_id: String,
    pub seated: usize,
    pub capacity: usize,
}

/// Unseated guests of one side
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterCounter {
    pub side: Side,
    /// Guests still in the roster zone
    pub unseated: usize,
    pub roster_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardCounters {
    /// Guests seated at any table
    pub placed: usize,
    /// Guests on both rosters
    pub total: usize,
    pub tables: Vec<TableCounter>,
    pub rosters: Vec<RosterCounter>,
}

impl BoardCounters {
    pub fn compute(
        topology: &ZoneTopology,
        registry: &GuestRegistry,
        assignment: &SeatingAssignment,
    ) -> Self {
        let tables = topology
            .tables()
            .map(|zone| TableCounter {
                zone_id: zone.id.clone(),
                seated: assignment.count_by_zone(&zone.id),
                capacity: zone.capacity.limit().unwrap_or(0),
            })
            .collect();

        let rosters = Side::ALL
            .iter()
            .map(|&side| RosterCounter {
                side,
                unseated: assignment.count_by_zone(&topology.roster_zone(side).id),
                roster_size: registry.len(side),
            })
            .collect();

        Self {
            placed: assignment.count_placed(topology),
            total: registry.total(),
            tables,
            rosters,
        }
    }

    pub fn table(&self, zone_id: &str) -> Option<&TableCounter> {
        self.tables.iter().find(|t| t.zone_id == zone_id)
    }

    pub fn roster(&self, side: Side) -> Option<&RosterCounter> {
        self.rosters.iter().find(|r| r.side == side)
    }
}
