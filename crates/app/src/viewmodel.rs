//! Board view model
//!
//! A read-only capture of the board after an applied event. The console
//! renders it as text and uses it to find a guest's current zone.

use std::fmt::Write as _;

use seatplan_core::{BoardCounters, Capacity, Side, SyncReconciler};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneView {
    pub id: String,
    pub display_name: String,
    pub capacity: Capacity,
    /// Display order
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    /// Board order: roster zones, head table, standard tables
    pub zones: Vec<ZoneView>,
    pub counters: BoardCounters,
    pub pending_delete: Option<(Side, String)>,
}

impl BoardView {
    pub fn capture(reconciler: &SyncReconciler) -> Self {
        let assignment = reconciler.assignment();
        let zones = reconciler
            .topology()
            .zones()
            .iter()
            .map(|zone| ZoneView {
                id: zone.id.clone(),
                display_name: zone.display_name.clone(),
                capacity: zone.capacity,
                names: assignment.zone(&zone.id).to_vec(),
            })
            .collect();

        Self {
            zones,
            counters: reconciler.counters(),
            pending_delete: reconciler
                .pending_delete()
                .map(|(side, name)| (side, name.to_string())),
        }
    }

    /// Zone currently holding `name`
    pub fn locate(&self, name: &str) -> Option<&str> {
        self.zones
            .iter()
            .find(|zone| zone.names.iter().any(|n| n == name))
            .map(|zone| zone.id.as_str())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Seated: {}/{}",
            self.counters.placed, self.counters.total
        );

        for zone in &self.zones {
            let count = match zone.capacity {
                Capacity::Limited(max) => format!("{}/{}", zone.names.len(), max),
                Capacity::Unbounded => {
                    let size = self
                        .counters
                        .rosters
                        .iter()
                        .find(|r| r.side.roster_zone_id() == zone.id)
                        .map_or(0, |r| r.roster_size);
                    format!("{}/{}", zone.names.len(), size)
                }
            };
            let names = if zone.names.is_empty() {
                "-".to_string()
            } else {
                zone.names.join(", ")
            };
            let _ = writeln!(
                out,
                "{} [{}] ({}): {}",
                zone.display_name, zone.id, count, names
            );
        }

        if let Some((side, name)) = &self.pending_delete {
            let _ = writeln!(out, "Delete {} from {}? (yes/no)", name, side);
        }
        out
    }
}

#[cfg(test)]
impl BoardView {
    pub fn zone(&self, id: &str) -> Option<&ZoneView> {
        self.zones.iter().find(|zone| zone.id == id)
    }

    pub fn plan(&self) -> seatplan_core::SeatingPlan {
        self.zones
            .iter()
            .map(|zone| (zone.id.clone(), zone.names.clone()))
            .collect()
    }
}
