//! Sync reconciler - the single event-processing path for board state
//!
//! Every local request and every inbound remote snapshot is fed through
//! [`SyncReconciler::handle`], which mutates the board and returns the
//! effects the caller must carry out (remote writes, UI notifications).
//! Events run to completion one at a time, so a snapshot is always applied
//! in full before the next event is looked at.
//!
//! Remote snapshots always win. Local edits are written back as full
//! documents and race with other clients at the store: last write wins.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::assignment::{MoveOutcome, SeatingAssignment, SeatingPlan};
use crate::counters::BoardCounters;
use crate::invariants;
use crate::models::Side;
use crate::ordering::PinnedSet;
use crate::registry::GuestRegistry;
use crate::remote::{Document, ResourceKey};
use crate::topology::ZoneTopology;
use crate::validator::MoveRejection;

/// Something that happened to the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    AddGuest { side: Side, name: String },
    /// First step of a delete; nothing changes until confirmed
    RequestDelete { side: Side, name: String },
    ConfirmDelete,
    CancelDelete,
    MoveGuest { name: String, from: String, to: String },
    /// Full roster document pushed by the store, `None` if absent
    RosterSnapshot { side: Side, names: Option<Vec<String>> },
    /// Full seating plan pushed by the store, `None` if absent
    PlanSnapshot(Option<SeatingPlan>),
}

impl Event {
    /// Turn a delivered document into the matching snapshot event
    pub fn from_snapshot(key: ResourceKey, document: Option<Document>) -> Self {
        match (key, document) {
            (_, Some(Document::Roster { side, names })) => Event::RosterSnapshot {
                side,
                names: Some(names),
            },
            (_, Some(Document::SeatingPlan(plan))) => Event::PlanSnapshot(Some(plan)),
            (ResourceKey::Roster(side), None) => Event::RosterSnapshot { side, names: None },
            (ResourceKey::SeatingPlan, None) => Event::PlanSnapshot(None),
        }
    }
}

/// Why a delete request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteRefusal {
    Pinned,
    UnknownGuest,
}

/// Work the caller must carry out after an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    WriteRoster { side: Side, names: Vec<String> },
    WriteSeatingPlan(SeatingPlan),
    /// The move was refused; any optimistic UI change must revert
    MoveRejected { name: String, rejection: MoveRejection },
    /// Ask the user to confirm deleting this guest
    ConfirmationRequired { side: Side, name: String },
    DeleteRefused { name: String, reason: DeleteRefusal },
    /// Board state changed and should be redrawn
    StateChanged,
}

impl Effect {
    /// The store document this effect writes, if any
    pub fn into_document(self) -> Option<Document> {
        match self {
            Effect::WriteRoster { side, names } => Some(Document::Roster { side, names }),
            Effect::WriteSeatingPlan(plan) => Some(Document::SeatingPlan(plan)),
            _ => None,
        }
    }
}

/// Owns the guest registry and seating assignment for one board
#[derive(Debug, Clone)]
pub struct SyncReconciler {
    topology: Arc<ZoneTopology>,
    registry: GuestRegistry,
    assignment: SeatingAssignment,
    /// Last known plan, re-applied whenever a roster changes
    plan_basis: SeatingPlan,
    pending_delete: Option<(Side, String)>,
}

impl SyncReconciler {
    pub fn new(topology: Arc<ZoneTopology>, pinned: PinnedSet) -> Self {
        let assignment = SeatingAssignment::new(&topology);
        Self {
            topology,
            registry: GuestRegistry::new(pinned),
            assignment,
            plan_basis: SeatingPlan::new(),
            pending_delete: None,
        }
    }

    pub fn topology(&self) -> &ZoneTopology {
        &self.topology
    }

    pub fn registry(&self) -> &GuestRegistry {
        &self.registry
    }

    pub fn assignment(&self) -> &SeatingAssignment {
        &self.assignment
    }

    /// Guest awaiting delete confirmation
    pub fn pending_delete(&self) -> Option<(Side, &str)> {
        self.pending_delete
            .as_ref()
            .map(|(side, name)| (*side, name.as_str()))
    }

    pub fn counters(&self) -> BoardCounters {
        BoardCounters::compute(&self.topology, &self.registry, &self.assignment)
    }

    /// Apply one event and return the resulting effects
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        let effects = match event {
            Event::AddGuest { side, name } => self.add_guest(side, &name),
            Event::RequestDelete { side, name } => self.request_delete(side, name),
            Event::ConfirmDelete => self.confirm_delete(),
            Event::CancelDelete => {
                if let Some((_, name)) = self.pending_delete.take() {
                    debug!(name = %name, "Delete cancelled");
                }
                Vec::new()
            }
            Event::MoveGuest { name, from, to } => self.move_guest(name, &from, &to),
            Event::RosterSnapshot { side, names } => self.apply_roster_snapshot(side, names),
            Event::PlanSnapshot(plan) => self.apply_plan_snapshot(plan),
        };

        invariants::assert_board_invariants(&self.assignment, &self.registry);
        effects
    }

    fn add_guest(&mut self, side: Side, name: &str) -> Vec<Effect> {
        if !self.registry.add(side, name) {
            return Vec::new();
        }
        let Some(guest) = self.registry.guest_on(side, name.trim()).cloned() else {
            return Vec::new();
        };

        if let MoveOutcome::Rejected(rejection) =
            self.assignment
                .place_in_roster(&guest, &self.topology, &self.registry)
        {
            warn!(name = %guest.name, %rejection, "Could not place new guest in roster zone");
        }
        info!(side = %side, name = %guest.name, "Guest added");

        let mut effects = vec![Effect::WriteRoster {
            side,
            names: self.registry.list(side),
        }];
        self.commit_plan(&mut effects);
        effects.push(Effect::StateChanged);
        effects
    }

    fn request_delete(&mut self, side: Side, name: String) -> Vec<Effect> {
        let reason = match self.registry.guest_on(side, &name) {
            None => Some(DeleteRefusal::UnknownGuest),
            Some(guest) if guest.pinned => Some(DeleteRefusal::Pinned),
            Some(_) => None,
        };
        if let Some(reason) = reason {
            debug!(name = %name, ?reason, "Delete refused");
            return vec![Effect::DeleteRefused { name, reason }];
        }

        self.pending_delete = Some((side, name.clone()));
        vec![Effect::ConfirmationRequired { side, name }]
    }

    fn confirm_delete(&mut self) -> Vec<Effect> {
        let Some((side, name)) = self.pending_delete.take() else {
            return Vec::new();
        };
        if self.registry.remove(side, &name).is_none() {
            // Removed by a remote snapshot while awaiting confirmation
            return Vec::new();
        }
        self.assignment.remove_guest_everywhere(&name);
        info!(side = %side, name = %name, "Guest deleted");

        let mut effects = vec![Effect::WriteRoster {
            side,
            names: self.registry.list(side),
        }];
        self.commit_plan(&mut effects);
        effects.push(Effect::StateChanged);
        effects
    }

    fn move_guest(&mut self, name: String, from: &str, to: &str) -> Vec<Effect> {
        match self
            .assignment
            .move_guest(&name, from, to, &self.topology, &self.registry)
        {
            MoveOutcome::Moved => {
                debug!(name = %name, from, to, "Guest moved");
                let mut effects = Vec::new();
                self.commit_plan(&mut effects);
                effects.push(Effect::StateChanged);
                effects
            }
            MoveOutcome::Unchanged => Vec::new(),
            MoveOutcome::Rejected(rejection) => {
                debug!(name = %name, from, to, %rejection, "Move rejected");
                vec![Effect::MoveRejected { name, rejection }]
            }
        }
    }

    fn apply_roster_snapshot(&mut self, side: Side, names: Option<Vec<String>>) -> Vec<Effect> {
        self.registry.replace_roster(side, names.unwrap_or_default());
        self.assignment
            .replace_all(&self.plan_basis, &self.topology, &self.registry);

        if let Some((pending_side, pending_name)) = &self.pending_delete {
            if self.registry.guest_on(*pending_side, pending_name).is_none() {
                self.pending_delete = None;
            }
        }
        debug!(side = %side, size = self.registry.len(side), "Roster snapshot applied");
        vec![Effect::StateChanged]
    }

    fn apply_plan_snapshot(&mut self, plan: Option<SeatingPlan>) -> Vec<Effect> {
        self.plan_basis = plan.unwrap_or_default();
        self.assignment
            .replace_all(&self.plan_basis, &self.topology, &self.registry);
        debug!(zones = self.plan_basis.len(), "Seating plan snapshot applied");
        vec![Effect::StateChanged]
    }

    /// Serialize the assignment and queue it for writing
    fn commit_plan(&mut self, effects: &mut Vec<Effect>) {
        let plan = self.assignment.to_plan();
        self.plan_basis = plan.clone();
        effects.push(Effect::WriteSeatingPlan(plan));
    }
}
