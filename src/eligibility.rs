//! Caller-side eligibility filtering.
//!
//! The rebalancer expects items that were already classified as eligible.
//! This module offers the classification used by spaced-repetition hosts
//! before handing items over:
//! - New items (interval 0) are not scheduled yet
//! - Suspended items carry a sentinel due far in the future
//! - Items above the largest rebalanced interval are left alone
//!
//! Exclusions are reported, never fatal.

use serde::{Deserialize, Serialize};

use crate::models::ScheduledItem;

/// Default largest interval taken into account.
pub const DEFAULT_MAX_INTERVAL: u32 = 21;

/// Default absolute due above which an item counts as suspended.
pub const DEFAULT_SUSPENDED_DUE: i64 = 1_000_000_000;

/// Why an item was left out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Exclusion {
    /// Interval 0: the item has never been scheduled.
    New,
    /// Due beyond the suspension threshold.
    Suspended,
    /// Interval above the filter's maximum.
    IntervalOutOfRange,
}

/// Eligible items plus the excluded ones with their reason.
#[derive(Debug, Clone, Default)]
pub struct Eligibility {
    /// Items to hand to the rebalancer, in input order.
    pub eligible: Vec<ScheduledItem>,
    /// Excluded items, in input order.
    pub excluded: Vec<(ScheduledItem, Exclusion)>,
}

impl Eligibility {
    /// Number of excluded items with the given reason.
    pub fn excluded_count(&self, reason: Exclusion) -> usize {
        self.excluded.iter().filter(|(_, r)| *r == reason).count()
    }
}

/// Classifies raw items into eligible and excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EligibilityFilter {
    /// Largest interval kept.
    pub max_interval: u32,
    /// Absolute due above which an item is suspended.
    pub suspended_due: i64,
}

impl Default for EligibilityFilter {
    fn default() -> Self {
        Self {
            max_interval: DEFAULT_MAX_INTERVAL,
            suspended_due: DEFAULT_SUSPENDED_DUE,
        }
    }
}

impl EligibilityFilter {
    /// Creates a filter with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the largest interval kept.
    pub fn with_max_interval(mut self, max_interval: u32) -> Self {
        self.max_interval = max_interval;
        self
    }

    /// Sets the suspension threshold.
    pub fn with_suspended_due(mut self, suspended_due: i64) -> Self {
        self.suspended_due = suspended_due;
        self
    }

    /// Reason an item is excluded, `None` if eligible.
    ///
    /// Checks run in order: new, suspended, interval range.
    pub fn exclusion(&self, item: &ScheduledItem) -> Option<Exclusion> {
        if item.interval == 0 {
            Some(Exclusion::New)
        } else if item.due > self.suspended_due {
            Some(Exclusion::Suspended)
        } else if item.interval > self.max_interval {
            Some(Exclusion::IntervalOutOfRange)
        } else {
            None
        }
    }

    /// Splits `items` into eligible and excluded.
    pub fn partition(&self, items: &[ScheduledItem]) -> Eligibility {
        let mut out = Eligibility::default();
        for item in items {
            match self.exclusion(item) {
                None => out.eligible.push(item.clone()),
                Some(reason) => out.excluded.push((item.clone(), reason)),
            }
        }
        out
    }

    /// Interval set `1..=max_interval`, ascending.
    pub fn interval_set(&self) -> Vec<u32> {
        (1..=self.max_interval).collect()
    }
}
