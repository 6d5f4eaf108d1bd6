//! Deterministic guest ordering
//!
//! Pinned guests come first, in the order they are listed in the pin set.
//! Everyone else follows in collation order: base letters first, ignoring
//! case and accents, then accents, then an exact code-point tiebreak so the
//! order is total.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// The fixed, explicitly-named set of pinned guests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinnedSet {
    names: Vec<String>,
}

impl PinnedSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for name in names {
            let name = name.into().trim().to_string();
            if !name.is_empty() && !set.names.contains(&name) {
                set.names.push(name);
            }
        }
        set
    }

    /// Position of `name` in the pin set, if pinned
    pub fn rank(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rank(name).is_some()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Sort key for one name. Field order is the comparison order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    tier: u8,
    pin_rank: usize,
    /// Base letters only
    primary: String,
    /// Lowercased, accents kept
    secondary: String,
    raw: String,
}

/// Decompose, drop combining marks and lowercase
fn base_letters(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            // Stroked d has no decomposition
            'đ' | 'Đ' => 'd',
            c => c,
        })
        .collect::<String>()
        .to_lowercase()
}

/// Total order over guest names within a zone
#[derive(Debug, Clone, Default)]
pub struct OrderingPolicy {
    pinned: PinnedSet,
}

impl OrderingPolicy {
    pub fn new(pinned: PinnedSet) -> Self {
        Self { pinned }
    }

    pub fn pinned(&self) -> &PinnedSet {
        &self.pinned
    }

    fn key(&self, name: &str) -> SortKey {
        match self.pinned.rank(name) {
            Some(rank) => SortKey {
                tier: 0,
                pin_rank: rank,
                primary: String::new(),
                secondary: String::new(),
                raw: name.to_string(),
            },
            None => SortKey {
                tier: 1,
                pin_rank: 0,
                primary: base_letters(name),
                secondary: name.nfc().collect::<String>().to_lowercase(),
                raw: name.to_string(),
            },
        }
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.key(a).cmp(&self.key(b))
    }

    /// Sort names in place
    pub fn sort(&self, names: &mut [String]) {
        names.sort_by_cached_key(|name| self.key(name));
    }

    pub fn sorted<I, S>(&self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        self.sort(&mut names);
        names
    }
}
