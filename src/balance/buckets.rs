//! Bucket model and deviation tracking for one interval.
//!
//! Items of an interval are indexed by due day. Two snapshots are kept:
//! the original assignment, frozen after construction, and the working
//! assignment mutated by the engine. Buckets store [`ItemId`] handles
//! only, so moves relocate indices and never compare item values.
//!
//! # Placement
//!
//! | Natural due day `d` | Original due day | Bucket |
//! |---------------------|------------------|--------|
//! | `d <= 0` or always-overdue | 0 | 1 |
//! | `1 <= d <= n` | `d` | `d` |
//! | `d > n` | `n + 1` | `n` |

use std::collections::HashMap;

use crate::error::{RebalanceError, Result};
use crate::models::{Average, ItemId, ScheduledItem};

/// Where an item starts within its interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Recorded original due day (0 = overdue, `n + 1` = over-scheduled).
    pub original_due_day: u32,
    /// Bucket the item is filed into, within `1..=n`.
    pub bucket: u32,
}

impl Placement {
    /// Whether the item was overdue when classified.
    #[inline]
    pub fn is_overdue(&self) -> bool {
        self.original_due_day == 0
    }
}

/// Computes the placement of an item in an interval of length `interval`.
///
/// # Errors
/// [`RebalanceError::Classification`] when the item belongs to another
/// interval, when its day offset overflows, or when the resulting bucket
/// falls outside `1..=interval`.
pub fn classify(item: &ScheduledItem, interval: u32, today: i64) -> Result<Placement> {
    let fail = |reason: String| RebalanceError::Classification {
        item_id: item.id.clone(),
        interval: item.interval,
        due: item.due,
        today,
        reason,
    };

    if item.interval != interval {
        return Err(fail(format!("item filed under interval {interval}")));
    }
    if interval == 0 {
        return Err(fail("interval has no due days".into()));
    }

    let natural = item
        .natural_due_day(today)
        .ok_or_else(|| fail("due day offset overflows".into()))?;

    let placement = if item.always_overdue || natural <= 0 {
        Placement {
            original_due_day: 0,
            bucket: 1,
        }
    } else if natural > i64::from(interval) {
        Placement {
            original_due_day: interval + 1,
            bucket: interval,
        }
    } else {
        let day = natural as u32;
        Placement {
            original_due_day: day,
            bucket: day,
        }
    };

    if placement.bucket == 0 || placement.bucket > interval {
        return Err(fail(format!(
            "bucket {} outside 1..={interval}",
            placement.bucket
        )));
    }
    Ok(placement)
}

/// Original and working due-day buckets of one interval.
#[derive(Debug, Clone)]
pub struct IntervalBuckets {
    interval: u32,
    average: Average,
    /// Day `d` lives at index `d - 1`.
    original: Vec<Vec<ItemId>>,
    working: Vec<Vec<ItemId>>,
    original_due_day: HashMap<ItemId, u32>,
    overdue: usize,
    overscheduled: usize,
    excluded_overdue: usize,
}

impl IntervalBuckets {
    /// Builds the buckets of `interval` from its members.
    ///
    /// Overdue members are filed into day 1 when `reschedule_overdue` is set
    /// and left out entirely otherwise. The average is computed once, here,
    /// from the original assignment.
    ///
    /// # Errors
    /// Propagates [`classify`] failures; no member is ever dropped silently.
    pub fn build<'a, I>(interval: u32, members: I, today: i64, reschedule_overdue: bool) -> Result<Self>
    where
        I: IntoIterator<Item = (ItemId, &'a ScheduledItem)>,
    {
        let days = interval as usize;
        let mut original: Vec<Vec<ItemId>> = vec![Vec::new(); days];
        let mut original_due_day = HashMap::new();
        let mut overdue = 0;
        let mut overscheduled = 0;
        let mut excluded_overdue = 0;

        for (id, item) in members {
            let placement = classify(item, interval, today)?;
            if placement.is_overdue() {
                if !reschedule_overdue {
                    excluded_overdue += 1;
                    continue;
                }
                overdue += 1;
            } else if placement.original_due_day > interval {
                overscheduled += 1;
            }
            original[(placement.bucket - 1) as usize].push(id);
            original_due_day.insert(id, placement.original_due_day);
        }

        let total = original_due_day.len() as u64;
        let working = original.clone();

        Ok(Self {
            interval,
            average: Average::new(total, interval),
            original,
            working,
            original_due_day,
            overdue,
            overscheduled,
            excluded_overdue,
        })
    }

    /// Interval length.
    #[inline]
    pub fn interval(&self) -> u32 {
        self.interval
    }

    /// Average fixed from the original assignment.
    #[inline]
    pub fn average(&self) -> &Average {
        &self.average
    }

    /// Number of items in the interval.
    #[inline]
    pub fn len(&self) -> usize {
        self.original_due_day.len()
    }

    /// Whether the interval holds no items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.original_due_day.is_empty()
    }

    /// Items recorded with original due day 0.
    pub fn overdue_count(&self) -> usize {
        self.overdue
    }

    /// Items recorded with original due day `n + 1`.
    pub fn overscheduled_count(&self) -> usize {
        self.overscheduled
    }

    /// Overdue items left out because rescheduling overdue items is off.
    pub fn excluded_overdue_count(&self) -> usize {
        self.excluded_overdue
    }

    /// Original due day of an item, `None` if it is not in this interval.
    pub fn original_due_day(&self, id: ItemId) -> Option<u32> {
        self.original_due_day.get(&id).copied()
    }

    /// Working bucket of `day`.
    pub fn bucket(&self, day: u32) -> &[ItemId] {
        &self.working[(day - 1) as usize]
    }

    pub(crate) fn bucket_mut(&mut self, day: u32) -> &mut Vec<ItemId> {
        &mut self.working[(day - 1) as usize]
    }

    /// Original bucket of `day`.
    pub fn original_bucket(&self, day: u32) -> &[ItemId] {
        &self.original[(day - 1) as usize]
    }

    /// Working bucket sizes, day 1 first.
    pub fn counts(&self) -> Vec<usize> {
        self.working.iter().map(Vec::len).collect()
    }

    /// Original bucket sizes, day 1 first.
    pub fn original_counts(&self) -> Vec<usize> {
        self.original.iter().map(Vec::len).collect()
    }

    /// Bias-corrected deviations of the working buckets, day 1 first.
    ///
    /// Always recomputed from the current working state.
    pub fn deviations(&self) -> Vec<i64> {
        self.working
            .iter()
            .map(|b| self.average.deviation(b.len()))
            .collect()
    }

    /// Unrounded deviations scaled by the interval length, day 1 first.
    pub fn scaled_raw_deviations(&self) -> Vec<i64> {
        self.working
            .iter()
            .map(|b| self.average.scaled_raw_deviation(b.len()))
            .collect()
    }

    /// Whether every working bucket is at a balanced size.
    pub fn is_balanced(&self) -> bool {
        self.deviations().iter().all(|&d| d == 0)
    }

    /// Final assignment `(item, original due day, working due day)`, by item.
    pub fn assignments(&self) -> Vec<(ItemId, u32, u32)> {
        let mut out: Vec<(ItemId, u32, u32)> = self
            .working
            .iter()
            .zip(1..=self.interval)
            .flat_map(|(bucket, day)| {
                bucket
                    .iter()
                    .map(move |&id| (id, self.original_due_day[&id], day))
            })
            .collect();
        out.sort_by_key(|&(id, _, _)| id);
        out
    }
}
