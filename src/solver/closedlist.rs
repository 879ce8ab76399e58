use crate::common::{ConstraintSet, NodeId};

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClosedEntry {
    pub(crate) node: NodeId,
    pub(crate) cost: Option<usize>, // None when the oracle found no plan
}

/// Every constraint set ever generated, keyed by value so the same set
/// reached through a different branching order is recognised.
#[derive(Debug, Default)]
pub(crate) struct ClosedList {
    entries: HashMap<ConstraintSet, ClosedEntry>,
}

impl ClosedList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Keeps the first entry for a key. Returns false if the key was known.
    pub(crate) fn insert(&mut self, key: ConstraintSet, entry: ClosedEntry) -> bool {
        match self.entries.entry(key) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(vacant) => {
                vacant.insert(entry);
                true
            }
        }
    }

    pub(crate) fn get(&self, key: &ConstraintSet) -> Option<&ClosedEntry> {
        self.entries.get(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
