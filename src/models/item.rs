//! Schedulable item model.
//!
//! An item is an opaque unit (a flashcard, a review, a maintenance job)
//! belonging to one interval cohort and due on one absolute day.
//! The rebalancer never mutates items; it only proposes new due days.

use serde::{Deserialize, Serialize};

/// Stable handle of an item inside one rebalancing run.
///
/// The index is the item's position in the slice handed to the rebalancer.
/// Items are identified by this handle only, never by value, so two items
/// with identical fields remain distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub usize);

impl ItemId {
    /// Position in the input slice.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// An item to be rebalanced.
///
/// # Time Representation
/// `due` is an absolute day number on the same axis as the run's `today`.
/// The natural due day of the item is `due - today`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledItem {
    /// Caller-side identifier, used for diagnostics and change lookup.
    pub id: String,
    /// Interval cohort (days).
    pub interval: u32,
    /// Absolute due day.
    pub due: i64,
    /// Treat as overdue regardless of `due` (e.g. learning-queue items).
    pub always_overdue: bool,
}

impl ScheduledItem {
    /// Creates a new item.
    pub fn new(id: impl Into<String>, interval: u32, due: i64) -> Self {
        Self {
            id: id.into(),
            interval,
            due,
            always_overdue: false,
        }
    }

    /// Marks the item as belonging to an always-overdue category.
    pub fn with_always_overdue(mut self) -> Self {
        self.always_overdue = true;
        self
    }

    /// Day offset from `today`, `None` on arithmetic overflow.
    pub fn natural_due_day(&self, today: i64) -> Option<i64> {
        self.due.checked_sub(today)
    }

    /// Whether the item is overdue relative to `today`.
    ///
    /// An item that is due today or earlier counts as overdue.
    pub fn is_overdue(&self, today: i64) -> bool {
        self.always_overdue || self.natural_due_day(today).is_some_and(|d| d <= 0)
    }
}
