//! Seating zones - roster holding areas and capacity-bounded tables

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Side;

/// Kind of zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    /// Unbounded holding zone for one side's unseated guests
    Roster(Side),
    /// Capacity-bounded seating zone
    Table,
}

/// Maximum number of guests a zone may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capacity {
    Unbounded,
    Limited(usize),
}

impl Capacity {
    /// Whether `occupied` guests already fill the zone
    pub fn is_full(self, occupied: usize) -> bool {
        match self {
            Capacity::Unbounded => false,
            Capacity::Limited(max) => occupied >= max,
        }
    }

    pub fn limit(self) -> Option<usize> {
        match self {
            Capacity::Unbounded => None,
            Capacity::Limited(max) => Some(max),
        }
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capacity::Unbounded => f.write_str("∞"),
            Capacity::Limited(max) => write!(f, "{}", max),
        }
    }
}

/// A zone on the board, created once at initialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub display_name: String,
    pub kind: ZoneKind,
    pub capacity: Capacity,
}

impl Zone {
    pub fn roster(side: Side) -> Self {
        let display_name = match side {
            Side::Groom => "Groom's guests",
            Side::Bride => "Bride's guests",
        };
        Self {
            id: side.roster_zone_id().to_string(),
            display_name: display_name.to_string(),
            kind: ZoneKind::Roster(side),
            capacity: Capacity::Unbounded,
        }
    }

    pub fn table(id: impl Into<String>, display_name: impl Into<String>, capacity: usize) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind: ZoneKind::Table,
            capacity: Capacity::Limited(capacity),
        }
    }

    pub fn is_table(&self) -> bool {
        self.kind == ZoneKind::Table
    }

    /// Side owning this zone, if it is a roster zone
    pub fn roster_side(&self) -> Option<Side> {
        match self.kind {
            ZoneKind::Roster(side) => Some(side),
            ZoneKind::Table => None,
        }
    }
}
