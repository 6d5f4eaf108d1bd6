//! Guest registry - owns both side rosters
//!
//! The registry is the only place guests are created or destroyed. Pin status
//! is decided here, once, when a `Guest` is constructed.

use tracing::{debug, warn};

use crate::models::{Guest, Side};
use crate::ordering::{OrderingPolicy, PinnedSet};

/// Both rosters plus the ordering used to list them
#[derive(Debug, Clone, Default)]
pub struct GuestRegistry {
    ordering: OrderingPolicy,
    rosters: [Vec<Guest>; 2],
}

impl GuestRegistry {
    /// Create an empty registry
    pub fn new(pinned: PinnedSet) -> Self {
        Self {
            ordering: OrderingPolicy::new(pinned),
            rosters: [Vec::new(), Vec::new()],
        }
    }

    fn make_guest(&self, side: Side, name: String) -> Guest {
        let pinned = self.ordering.pinned().contains(&name);
        Guest::new(name, side, pinned)
    }

    /// Add a guest to a side's roster
    ///
    /// Blank names, names already on this roster and names already on the
    /// other side's roster are ignored. Returns whether the roster changed.
    pub fn add(&mut self, side: Side, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        if self.guest_on(side, name).is_some() {
            debug!(side = %side, name = %name, "Guest already on roster");
            return false;
        }
        if self.guest_on(side.opposite(), name).is_some() {
            warn!(side = %side, name = %name, "Guest already belongs to the other side");
            return false;
        }

        let guest = self.make_guest(side, name.to_string());
        self.rosters[side.index()].push(guest);
        true
    }

    /// Remove a guest from a side's roster
    ///
    /// The caller is responsible for purging the guest from every zone.
    pub fn remove(&mut self, side: Side, name: &str) -> Option<Guest> {
        let roster = &mut self.rosters[side.index()];
        let pos = roster.iter().position(|g| g.name == name)?;
        Some(roster.remove(pos))
    }

    /// Replace a side's roster with an inbound snapshot
    ///
    /// Same rules as [`add`](Self::add): blanks and repeats are skipped, and
    /// a name the other side already holds stays with that side.
    pub fn replace_roster<I, S>(&mut self, side: Side, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roster: Vec<Guest> = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() || roster.iter().any(|g| g.name == name) {
                continue;
            }
            if self.guest_on(side.opposite(), name).is_some() {
                warn!(side = %side, name = %name, "Snapshot lists a guest of the other side, skipping");
                continue;
            }
            roster.push(self.make_guest(side, name.to_string()));
        }
        self.rosters[side.index()] = roster;
    }

    /// A side's roster names in display order
    pub fn list(&self, side: Side) -> Vec<String> {
        self.ordering.sorted(self.names(side))
    }

    /// A side's roster names in insertion order
    pub fn names(&self, side: Side) -> impl Iterator<Item = &str> {
        self.rosters[side.index()].iter().map(|g| g.name.as_str())
    }

    /// Look a guest up on either roster
    pub fn guest(&self, name: &str) -> Option<&Guest> {
        Side::ALL.iter().find_map(|&side| self.guest_on(side, name))
    }

    pub fn guest_on(&self, side: Side, name: &str) -> Option<&Guest> {
        self.rosters[side.index()].iter().find(|g| g.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.guest(name).is_some()
    }

    /// Every guest, groom side first
    pub fn guests(&self) -> impl Iterator<Item = &Guest> {
        self.rosters.iter().flatten()
    }

    /// Roster size for one side
    pub fn len(&self, side: Side) -> usize {
        self.rosters[side.index()].len()
    }

    /// Total guests across both sides
    pub fn total(&self) -> usize {
        self.rosters.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn ordering(&self) -> &OrderingPolicy {
        &self.ordering
    }
}
