//! Seating assignment - which guests sit in which zone
//!
//! Mutated only through validated moves, the delete cascade, or wholesale
//! replacement from a remote snapshot. Every zone of the topology always has
//! an entry, possibly empty.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::models::Guest;
use crate::registry::GuestRegistry;
use crate::topology::ZoneTopology;
use crate::validator::{ConstraintValidator, MoveRejection};

/// Serialized seating plan: zone id to ordered guest names
pub type SeatingPlan = BTreeMap<String, Vec<String>>;

/// Result of a move request
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum MoveOutcome {
    Moved,
    /// Source and target are the same zone
    Unchanged,
    Rejected(MoveRejection),
}

impl MoveOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, MoveOutcome::Moved)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeatingAssignment {
    zones: BTreeMap<String, Vec<String>>,
}

impl SeatingAssignment {
    /// Empty assignment with one entry per zone
    pub fn new(topology: &ZoneTopology) -> Self {
        let zones = topology
            .zones()
            .iter()
            .map(|z| (z.id.clone(), Vec::new()))
            .collect();
        Self { zones }
    }

    /// Guests in a zone, in display order
    pub fn zone(&self, zone_id: &str) -> &[String] {
        self.zones.get(zone_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn count_by_zone(&self, zone_id: &str) -> usize {
        self.zone(zone_id).len()
    }

    /// Guests seated at tables
    pub fn count_placed(&self, topology: &ZoneTopology) -> usize {
        topology.tables().map(|z| self.count_by_zone(&z.id)).sum()
    }

    /// Zone currently holding `name`
    pub fn locate(&self, name: &str) -> Option<&str> {
        self.zones
            .iter()
            .find(|(_, names)| names.iter().any(|n| n == name))
            .map(|(id, _)| id.as_str())
    }

    /// Every placed name, zone by zone
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.zones.values().flatten().map(String::as_str)
    }

    /// Move a guest between zones after validating the target
    pub fn move_guest(
        &mut self,
        name: &str,
        from: &str,
        to: &str,
        topology: &ZoneTopology,
        registry: &GuestRegistry,
    ) -> MoveOutcome {
        let Some(guest) = registry.guest(name) else {
            return MoveOutcome::Rejected(MoveRejection::UnknownGuest(name.to_string()));
        };
        if !topology.contains(from) {
            return MoveOutcome::Rejected(MoveRejection::UnknownZone(from.to_string()));
        }
        let Some(target) = topology.get(to) else {
            return MoveOutcome::Rejected(MoveRejection::UnknownZone(to.to_string()));
        };
        let Some(pos) = self.zone(from).iter().position(|n| n == name) else {
            return MoveOutcome::Rejected(MoveRejection::NotInZone {
                name: name.to_string(),
                zone: from.to_string(),
            });
        };
        if from == to {
            return MoveOutcome::Unchanged;
        }
        if let Err(rejection) = ConstraintValidator::check(guest, target, self) {
            return MoveOutcome::Rejected(rejection);
        }

        if let Some(names) = self.zones.get_mut(from) {
            names.remove(pos);
        }
        let names = self.zones.entry(to.to_string()).or_default();
        names.push(name.to_string());
        registry.ordering().sort(names);
        MoveOutcome::Moved
    }

    /// Put a freshly added guest into their side's roster zone
    pub fn place_in_roster(
        &mut self,
        guest: &Guest,
        topology: &ZoneTopology,
        registry: &GuestRegistry,
    ) -> MoveOutcome {
        if self.locate(&guest.name).is_some() {
            return MoveOutcome::Unchanged;
        }
        let roster = topology.roster_zone(guest.side);
        if let Err(rejection) = ConstraintValidator::check(guest, roster, self) {
            return MoveOutcome::Rejected(rejection);
        }

        let names = self.zones.entry(roster.id.clone()).or_default();
        names.push(guest.name.clone());
        registry.ordering().sort(names);
        MoveOutcome::Moved
    }

    /// Remove a guest from whichever zone holds them. Idempotent.
    pub fn remove_guest_everywhere(&mut self, name: &str) -> bool {
        let mut removed = false;
        for names in self.zones.values_mut() {
            let before = names.len();
            names.retain(|n| n != name);
            removed |= names.len() != before;
        }
        removed
    }

    /// Replace the whole assignment with a remote snapshot
    ///
    /// No placement rules are applied: the snapshot is authoritative even if
    /// it overfills a table. Zones missing from the snapshot become empty,
    /// unknown zones and names not in the registry are dropped, a name listed
    /// twice keeps its first position, and registry guests the snapshot does
    /// not place land in their roster zone.
    pub fn replace_all(
        &mut self,
        snapshot: &SeatingPlan,
        topology: &ZoneTopology,
        registry: &GuestRegistry,
    ) {
        let mut zones: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut dropped = 0usize;

        for zone in topology.zones() {
            let mut names = Vec::new();
            for name in snapshot.get(&zone.id).into_iter().flatten() {
                if registry.contains(name) && seen.insert(name.as_str()) {
                    names.push(name.clone());
                } else {
                    dropped += 1;
                }
            }
            zones.insert(zone.id.clone(), names);
        }

        for zone_id in snapshot.keys().filter(|id| !topology.contains(id)) {
            debug!(zone = %zone_id, "Ignoring unknown zone in snapshot");
        }

        for guest in registry.guests() {
            if seen.insert(guest.name.as_str()) {
                let roster = &topology.roster_zone(guest.side).id;
                if let Some(names) = zones.get_mut(roster) {
                    names.push(guest.name.clone());
                }
            }
        }

        for names in zones.values_mut() {
            registry.ordering().sort(names);
        }

        if dropped > 0 {
            debug!(dropped, "Dropped stale names while applying snapshot");
        }
        self.zones = zones;
    }

    /// Serialize for persistence, including empty zones
    pub fn to_plan(&self) -> SeatingPlan {
        self.zones.clone()
    }

    #[cfg(test)]
    pub(crate) fn push_unchecked(&mut self, zone_id: &str, name: &str) {
        self.zones
            .entry(zone_id.to_string())
            .or_default()
            .push(name.to_string());
    }
}
