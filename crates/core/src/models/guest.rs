//! Guest model

use serde::{Deserialize, Serialize};

use super::Side;

/// A named guest belonging to one side
///
/// `pinned` is fixed when the guest is constructed by the registry and is
/// never recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub name: String,
    pub side: Side,
    pub pinned: bool,
}

impl Guest {
    pub fn new(name: impl Into<String>, side: Side, pinned: bool) -> Self {
        Self {
            name: name.into(),
            side,
            pinned,
        }
    }
}
