//! Remote document store interface
//!
//! Durable shared state lives in three documents: one roster per side and
//! a single seating plan. Every read, write and subscription delivers the
//! full document value, never a diff. Implementations may be a network
//! client, an in-process store, or a mock.

mod memory;

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::assignment::SeatingPlan;
use crate::error::{Error, Result};
use crate::models::Side;

pub use memory::MemoryStore;

/// Address of one shared document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResourceKey {
    Roster(Side),
    SeatingPlan,
}

impl ResourceKey {
    pub const ALL: [ResourceKey; 3] = [
        ResourceKey::Roster(Side::Groom),
        ResourceKey::Roster(Side::Bride),
        ResourceKey::SeatingPlan,
    ];

    /// Store path, e.g. `guests/groom`
    pub fn path(self) -> &'static str {
        match self {
            ResourceKey::Roster(Side::Groom) => "guests/groom",
            ResourceKey::Roster(Side::Bride) => "guests/bride",
            ResourceKey::SeatingPlan => "seatingPlans/currentPlan",
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for ResourceKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.path() == s)
            .ok_or_else(|| Error::NotFound(format!("Unknown resource key: {}", s)))
    }
}

impl TryFrom<String> for ResourceKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ResourceKey> for String {
    fn from(key: ResourceKey) -> Self {
        key.path().to_string()
    }
}

/// Stored shape of a roster document
#[derive(Debug, Default, Serialize, Deserialize)]
struct RosterBody {
    #[serde(default)]
    names: Vec<String>,
}

/// A full document value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    Roster { side: Side, names: Vec<String> },
    SeatingPlan(SeatingPlan),
}

impl Document {
    pub fn key(&self) -> ResourceKey {
        match self {
            Document::Roster { side, .. } => ResourceKey::Roster(*side),
            Document::SeatingPlan(_) => ResourceKey::SeatingPlan,
        }
    }

    /// Encode as the JSON body kept by the store
    pub fn to_value(&self) -> Result<Value> {
        Ok(match self {
            Document::Roster { names, .. } => serde_json::to_value(RosterBody {
                names: names.clone(),
            })?,
            Document::SeatingPlan(plan) => serde_json::to_value(plan)?,
        })
    }

    /// Decode a JSON body fetched for `key`
    pub fn from_value(key: ResourceKey, value: Value) -> Result<Self> {
        Ok(match key {
            ResourceKey::Roster(side) => {
                let body: RosterBody = serde_json::from_value(value)?;
                Document::Roster {
                    side,
                    names: body.names,
                }
            }
            ResourceKey::SeatingPlan => Document::SeatingPlan(serde_json::from_value(value)?),
        })
    }
}

/// Called with the full current value of a document, `None` if absent
pub type SnapshotCallback = Arc<dyn Fn(ResourceKey, Option<Document>) + Send + Sync>;

/// Shared document store used to persist and distribute board state
///
/// Writes are full replacements and the last write wins.
pub trait RemoteStore: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch a document, `None` if it does not exist yet
    fn read(
        &self,
        key: ResourceKey,
    ) -> impl Future<Output = std::result::Result<Option<Document>, Self::Error>> + Send;

    /// Replace a document
    fn write(
        &self,
        document: Document,
    ) -> impl Future<Output = std::result::Result<(), Self::Error>> + Send;

    /// Register `callback` for a document
    ///
    /// The callback fires once with the current value and again after every
    /// change, from any client.
    fn subscribe(
        &self,
        key: ResourceKey,
        callback: SnapshotCallback,
    ) -> impl Future<Output = std::result::Result<(), Self::Error>> + Send;

    fn read_roster(
        &self,
        side: Side,
    ) -> impl Future<Output = std::result::Result<Option<Vec<String>>, Self::Error>> + Send {
        async move {
            Ok(match self.read(ResourceKey::Roster(side)).await? {
                Some(Document::Roster { names, .. }) => Some(names),
                _ => None,
            })
        }
    }

    fn write_roster(
        &self,
        side: Side,
        names: Vec<String>,
    ) -> impl Future<Output = std::result::Result<(), Self::Error>> + Send {
        self.write(Document::Roster { side, names })
    }

    fn read_seating_plan(
        &self,
    ) -> impl Future<Output = std::result::Result<Option<SeatingPlan>, Self::Error>> + Send {
        async move {
            Ok(match self.read(ResourceKey::SeatingPlan).await? {
                Some(Document::SeatingPlan(plan)) => Some(plan),
                _ => None,
            })
        }
    }

    fn write_seating_plan(
        &self,
        plan: SeatingPlan,
    ) -> impl Future<Output = std::result::Result<(), Self::Error>> + Send {
        self.write(Document::SeatingPlan(plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_key_paths() {
        for key in ResourceKey::ALL {
            assert_eq!(key.path().parse::<ResourceKey>().unwrap(), key);
        }
        assert!("guests/usher".parse::<ResourceKey>().is_err());

        let encoded = serde_json::to_string(&ResourceKey::Roster(Side::Bride)).unwrap();
        assert_eq!(encoded, "\"guests/bride\"");
    }

    #[test]
    fn test_roster_document_shape() {
        let doc = Document::Roster {
            side: Side::Groom,
            names: vec!["Alice".to_string()],
        };
        assert_eq!(doc.to_value().unwrap(), json!({ "names": ["Alice"] }));
    }

    #[test]
    fn test_decode_roster_without_names() {
        let doc = Document::from_value(ResourceKey::Roster(Side::Bride), json!({})).unwrap();
        assert_eq!(
            doc,
            Document::Roster {
                side: Side::Bride,
                names: vec![]
            }
        );
    }

    #[test]
    fn test_decode_seating_plan() {
        let doc = Document::from_value(
            ResourceKey::SeatingPlan,
            json!({ "table-head": ["Manal"], "table-1": [] }),
        )
        .unwrap();
        let Document::SeatingPlan(plan) = doc else {
            panic!("Wrong document type");
        };
        assert_eq!(plan["table-head"], vec!["Manal".to_string()]);
        assert!(plan["table-1"].is_empty());
    }

    #[test]
    fn test_malformed_plan_rejected() {
        assert!(Document::from_value(ResourceKey::SeatingPlan, json!(["table-1"])).is_err());
    }
}
