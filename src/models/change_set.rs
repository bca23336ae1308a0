//! Change-set (solution) model.
//!
//! The change-set is the sparse result of a run: one entry per item whose
//! due day differs from its original due day. Applying it is the caller's
//! job; nothing in this crate writes back to items.

use serde::{Deserialize, Serialize};

use super::ItemId;

/// A single proposed due-day change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Handle of the item in the input slice.
    pub item: ItemId,
    /// Caller-side identifier (denormalized for lookup convenience).
    pub item_id: String,
    /// Interval cohort of the item.
    pub interval: u32,
    /// Due day at the start of the run (0 = overdue, `interval + 1` = over-scheduled).
    pub original_due_day: u32,
    /// Due day after rebalancing, within `1..=interval`.
    pub new_due_day: u32,
    /// New absolute due day (`new_due_day + today`).
    pub new_due: i64,
}

impl Change {
    /// Signed displacement in days (`new - original`).
    #[inline]
    pub fn displacement(&self) -> i64 {
        i64::from(self.new_due_day) - i64::from(self.original_due_day)
    }
}

/// Ordered collection of changes, sorted by [`ItemId`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Changes, ascending by item handle.
    pub changes: Vec<Change>,
}

impl ChangeSet {
    /// Creates an empty change-set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a change-set, ordering entries by item handle.
    pub fn from_changes(mut changes: Vec<Change>) -> Self {
        changes.sort_by_key(|c| c.item);
        Self { changes }
    }

    /// Number of changed items.
    #[inline]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether no item changed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Looks up the change for an item handle.
    pub fn get(&self, item: ItemId) -> Option<&Change> {
        self.changes
            .binary_search_by_key(&item, |c| c.item)
            .ok()
            .map(|i| &self.changes[i])
    }

    /// Looks up the change for a caller-side identifier.
    pub fn find_by_id(&self, item_id: &str) -> Option<&Change> {
        self.changes.iter().find(|c| c.item_id == item_id)
    }

    /// New absolute due day for an item, if it changed.
    pub fn new_due(&self, item: ItemId) -> Option<i64> {
        self.get(item).map(|c| c.new_due)
    }

    /// Changes belonging to one interval.
    pub fn for_interval(&self, interval: u32) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(move |c| c.interval == interval)
    }

    /// Iterates over all changes.
    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }
}
