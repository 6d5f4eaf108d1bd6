//! Event sides - the two parties that own guest rosters

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One of the two guest-owning parties
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Groom,
    Bride,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Groom, Side::Bride];

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Groom => "groom",
            Side::Bride => "bride",
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Groom => Side::Bride,
            Side::Bride => Side::Groom,
        }
    }

    /// Id of the roster zone holding this side's unseated guests
    pub fn roster_zone_id(self) -> &'static str {
        match self {
            Side::Groom => "groom-guests",
            Side::Bride => "bride-guests",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Side::Groom => 0,
            Side::Bride => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groom" => Ok(Side::Groom),
            "bride" => Ok(Side::Bride),
            other => Err(Error::InvalidOperation(format!("Unknown side: {}", other))),
        }
    }
}
