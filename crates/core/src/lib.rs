//! Seatplan Core Library
//!
//! Guest rosters, zone topology, placement rules, the seating assignment and
//! the reconciler that keeps it in step with a shared document store.

pub mod assignment;
pub mod counters;
pub mod error;
pub mod invariants;
pub mod models;
pub mod ordering;
pub mod reconciler;
pub mod registry;
pub mod remote;
pub mod storage;
pub mod topology;
pub mod validator;

pub use assignment::{MoveOutcome, SeatingAssignment, SeatingPlan};
pub use counters::{BoardCounters, RosterCounter, TableCounter};
pub use error::{Error, Result};
pub use models::*;
pub use ordering::{OrderingPolicy, PinnedSet};
pub use reconciler::{DeleteRefusal, Effect, Event, SyncReconciler};
pub use registry::GuestRegistry;
pub use remote::{Document, MemoryStore, RemoteStore, ResourceKey, SnapshotCallback};
pub use storage::{DocumentDatabase, StoredDocument};
pub use topology::{BoardConfig, ZoneSpec, ZoneTopology};
pub use validator::{ConstraintValidator, MoveRejection};
