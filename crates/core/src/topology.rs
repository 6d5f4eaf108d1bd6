//! Board configuration and the fixed zone topology built from it
//!
//! The board is static configuration: two roster zones, one head table and
//! a configurable number of standard tables. It is parsed from TOML once at
//! startup and never mutated afterwards.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Side, Zone};
use crate::ordering::PinnedSet;

/// Default head table capacity
pub const HEAD_TABLE_CAPACITY: usize = 2;

/// Default number of standard tables
pub const STANDARD_TABLE_COUNT: usize = 19;

/// Default standard table capacity
pub const STANDARD_TABLE_CAPACITY: usize = 10;

/// Static description of one table zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSpec {
    pub id: String,
    pub display_name: String,
    pub capacity: usize,
}

impl Default for ZoneSpec {
    fn default() -> Self {
        Self {
            id: "table-head".to_string(),
            display_name: "Table d'honneur".to_string(),
            capacity: HEAD_TABLE_CAPACITY,
        }
    }
}

/// Board configuration section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Guests always sorted first
    pub pinned: PinnedSet,
    pub head_table: ZoneSpec,
    /// Number of standard tables, ids `table-1` .. `table-N`
    pub standard_tables: usize,
    pub standard_capacity: usize,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            pinned: PinnedSet::default(),
            head_table: ZoneSpec::default(),
            standard_tables: STANDARD_TABLE_COUNT,
            standard_capacity: STANDARD_TABLE_CAPACITY,
        }
    }
}

impl BoardConfig {
    /// Parse a board section from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a board section from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Ordered table specs: head table first, then standard tables
    pub fn table_specs(&self) -> Vec<ZoneSpec> {
        let mut specs = Vec::with_capacity(self.standard_tables + 1);
        specs.push(self.head_table.clone());
        specs.extend((1..=self.standard_tables).map(|n| ZoneSpec {
            id: format!("table-{}", n),
            display_name: format!("Table {}", n),
            capacity: self.standard_capacity,
        }));
        specs
    }
}

/// The fixed set of zones for a session
#[derive(Debug, Clone)]
pub struct ZoneTopology {
    zones: Vec<Zone>,
    index: HashMap<String, usize>,
}

impl ZoneTopology {
    /// Build the topology from board configuration
    pub fn from_config(config: &BoardConfig) -> Result<Self> {
        let mut zones: Vec<Zone> = Side::ALL.iter().map(|&side| Zone::roster(side)).collect();
        for spec in config.table_specs() {
            if spec.capacity == 0 {
                return Err(Error::Config(format!(
                    "Table '{}' must have a capacity of at least 1",
                    spec.id
                )));
            }
            zones.push(Zone::table(spec.id, spec.display_name, spec.capacity));
        }

        let mut index = HashMap::with_capacity(zones.len());
        for (i, zone) in zones.iter().enumerate() {
            if index.insert(zone.id.clone(), i).is_some() {
                return Err(Error::Config(format!("Duplicate zone id '{}'", zone.id)));
            }
        }

        Ok(Self { zones, index })
    }

    /// Get a zone by id
    pub fn get(&self, id: &str) -> Option<&Zone> {
        self.index.get(id).map(|&i| &self.zones[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All zones in board order (roster zones first)
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Table zones in board order
    pub fn tables(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().filter(|z| z.is_table())
    }

    /// The roster zone for a side
    pub fn roster_zone(&self, side: Side) -> &Zone {
        &self.zones[side.index()]
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
