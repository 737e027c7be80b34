//! Case-insensitive assembly identities.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Full name of an assembly, e.g.
/// `App, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null`.
///
/// Equality, ordering and hashing are case-insensitive over the full name;
/// the canonical (lower-cased) key is computed once at construction. Two ids
/// that differ only in case compare equal, so whichever spelling enters a
/// container first is the one it keeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AssemblyId {
    full_name: String,
    key: String,
}

impl AssemblyId {
    pub fn new(full_name: impl Into<String>) -> Self {
        let full_name = full_name.into();
        let key = full_name.to_lowercase();
        Self { full_name, key }
    }

    /// The full name exactly as it appears in the assembly manifest.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// The part of the full name before the first comma; the whole name if
    /// there is no comma. This is what tree nodes are labelled with.
    pub fn display_label(&self) -> &str {
        match self.full_name.find(',') {
            Some(idx) => &self.full_name[..idx],
            None => &self.full_name,
        }
    }

    /// The canonical lower-cased form driving comparisons.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl From<String> for AssemblyId {
    fn from(full_name: String) -> Self {
        Self::new(full_name)
    }
}

impl From<AssemblyId> for String {
    fn from(id: AssemblyId) -> Self {
        id.full_name
    }
}

impl From<&str> for AssemblyId {
    fn from(full_name: &str) -> Self {
        Self::new(full_name)
    }
}

impl PartialEq for AssemblyId {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for AssemblyId {}

impl PartialOrd for AssemblyId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AssemblyId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl Hash for AssemblyId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for AssemblyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}
