//! Due-day rebalancing.
//!
//! Redistributes the items of each interval over its due days so every day
//! holds `floor(avg)` or `ceil(avg)` items, moving as few items as short a
//! distance as the engine allows.
//!
//! # Pipeline
//!
//! 1. Group the items by interval (items of other intervals are skipped).
//! 2. Build the original and working buckets of each interval.
//! 3. Run the engine on each interval, in request order.
//! 4. Diff working against original due days into a [`ChangeSet`].
//!
//! The run is a pure function of its inputs: items are never mutated, and
//! the same input always yields the same change-set and report.

mod buckets;
mod engine;
pub mod mover;

pub use buckets::{classify, IntervalBuckets, Placement};
pub use engine::{iteration_cap, EngineState, IntervalEngine, SplitBias};

use std::collections::{HashMap, HashSet};

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{IntervalIterations, RebalanceError, Result};
use crate::models::{Change, ChangeSet, ItemId, ScheduledItem};
use crate::report::{IntervalSummary, RebalanceReport};

/// Input of a rebalancing run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceRequest {
    /// Intervals to rebalance, processed in this order.
    pub intervals: Vec<u32>,
    /// File overdue items into day 1 instead of leaving them out.
    pub reschedule_overdue: bool,
    /// Absolute day the due-day offsets are measured from.
    pub today: i64,
}

impl Default for RebalanceRequest {
    fn default() -> Self {
        Self {
            intervals: Vec::new(),
            reschedule_overdue: false,
            today: 0,
        }
    }
}

impl RebalanceRequest {
    /// Creates a request for the given intervals and day origin.
    pub fn new(intervals: impl IntoIterator<Item = u32>, today: i64) -> Self {
        Self {
            intervals: intervals.into_iter().collect(),
            today,
            ..Self::default()
        }
    }

    /// Sets whether overdue items are rescheduled.
    pub fn with_reschedule_overdue(mut self, reschedule_overdue: bool) -> Self {
        self.reschedule_overdue = reschedule_overdue;
        self
    }

    /// Checks that every requested interval has at least one due day.
    ///
    /// # Errors
    /// [`RebalanceError::InvalidInterval`] for the first zero interval.
    pub fn validate(&self) -> Result<()> {
        match self.intervals.iter().find(|&&i| i == 0) {
            Some(&interval) => Err(RebalanceError::InvalidInterval { interval }),
            None => Ok(()),
        }
    }

    /// Requested intervals without duplicates, first occurrence kept.
    pub fn unique_intervals(&self) -> Vec<u32> {
        let mut seen = HashSet::new();
        self.intervals
            .iter()
            .copied()
            .filter(|i| seen.insert(*i))
            .collect()
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceOutcome {
    /// Items with a new due day.
    pub changes: ChangeSet,
    /// Summary for human consumption.
    pub report: RebalanceReport,
}

/// Due-day rebalancer.
///
/// # Example
///
/// ```
/// use u_rebalance::balance::{RebalanceRequest, Rebalancer};
/// use u_rebalance::models::ScheduledItem;
///
/// // Three items of a 3-day interval, all due tomorrow (today = 100).
/// let items = vec![
///     ScheduledItem::new("A", 3, 101),
///     ScheduledItem::new("B", 3, 101),
///     ScheduledItem::new("C", 3, 101),
/// ];
/// let request = RebalanceRequest::new([3], 100);
///
/// let outcome = Rebalancer::new().rebalance_request(&items, &request).unwrap();
/// assert_eq!(outcome.changes.len(), 2);
/// assert_eq!(outcome.report.interval(3).unwrap().counts_after, vec![1, 1, 1]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rebalancer {
    /// Multiplier of the per-interval iteration cap.
    pub iteration_factor: u64,
    /// Receiver of the odd item in a bulk split.
    pub split_bias: SplitBias,
}

impl Default for Rebalancer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rebalancer {
    /// Creates a rebalancer with the default cap and split bias.
    pub fn new() -> Self {
        Self {
            iteration_factor: 1,
            split_bias: SplitBias::Later,
        }
    }

    /// Sets the iteration cap multiplier (at least 1).
    pub fn with_iteration_factor(mut self, factor: u64) -> Self {
        self.iteration_factor = factor.max(1);
        self
    }

    /// Sets the split bias of bulk corrections.
    pub fn with_split_bias(mut self, split_bias: SplitBias) -> Self {
        self.split_bias = split_bias;
        self
    }

    /// Rebalances `items` over `intervals`.
    pub fn rebalance(
        &self,
        items: &[ScheduledItem],
        intervals: &[u32],
        reschedule_overdue: bool,
        today: i64,
    ) -> Result<RebalanceOutcome> {
        let request = RebalanceRequest::new(intervals.iter().copied(), today)
            .with_reschedule_overdue(reschedule_overdue);
        self.rebalance_request(items, &request)
    }

    /// Rebalances `items` according to a request.
    ///
    /// # Errors
    /// - [`RebalanceError::InvalidInterval`] for a zero interval.
    /// - [`RebalanceError::Classification`] when an item cannot be filed.
    /// - [`RebalanceError::MoveAccounting`] on inconsistent bookkeeping.
    /// - [`RebalanceError::NotConverged`] when an interval exceeds its cap;
    ///   carries the iteration counts of every interval processed so far.
    pub fn rebalance_request(
        &self,
        items: &[ScheduledItem],
        request: &RebalanceRequest,
    ) -> Result<RebalanceOutcome> {
        request.validate()?;
        let intervals = request.unique_intervals();

        let mut members: HashMap<u32, Vec<ItemId>> =
            intervals.iter().map(|&i| (i, Vec::new())).collect();
        let mut skipped_items = 0;
        for (index, item) in items.iter().enumerate() {
            match members.get_mut(&item.interval) {
                Some(ids) => ids.push(ItemId(index)),
                None => skipped_items += 1,
            }
        }

        let mut changes = Vec::new();
        let mut summaries = Vec::with_capacity(intervals.len());
        let mut history: Vec<IntervalIterations> = Vec::with_capacity(intervals.len());

        for &interval in &intervals {
            let ids = members.remove(&interval).unwrap_or_default();
            let mut buckets = IntervalBuckets::build(
                interval,
                ids.iter().map(|&id| (id, &items[id.index()])),
                request.today,
                request.reschedule_overdue,
            )?;
            let counts_before = buckets.counts();
            let deviations_before = buckets.deviations();

            let cap = iteration_cap(interval, buckets.len(), self.iteration_factor);
            let (iterations, moved_items) = {
                let mut engine = IntervalEngine::new(&mut buckets, self.split_bias, cap);
                engine.run().map_err(|e| with_history(e, &history))?;
                (engine.iterations(), engine.moved_items())
            };
            history.push(IntervalIterations {
                interval,
                iterations,
            });

            let before = changes.len();
            for (id, original, new_day) in buckets.assignments() {
                if original != new_day {
                    let item = &items[id.index()];
                    changes.push(Change {
                        item: id,
                        item_id: item.id.clone(),
                        interval,
                        original_due_day: original,
                        new_due_day: new_day,
                        new_due: request.today + i64::from(new_day),
                    });
                }
            }

            summaries.push(IntervalSummary {
                interval,
                item_count: buckets.len(),
                overdue_count: buckets.overdue_count(),
                overscheduled_count: buckets.overscheduled_count(),
                excluded_overdue: buckets.excluded_overdue_count(),
                average: buckets.average().value,
                iterations,
                cap,
                moved_items,
                changed_items: changes.len() - before,
                counts_before,
                counts_after: buckets.counts(),
                deviations_before,
            });
        }

        let changes = ChangeSet::from_changes(changes);
        let report = RebalanceReport::calculate(&changes, summaries, skipped_items);
        info!(
            "rebalanced {} item(s) over {} interval(s): {} changed, {} iteration(s)",
            report.total_items,
            report.intervals.len(),
            report.changed_items,
            report.total_iterations()
        );

        Ok(RebalanceOutcome { changes, report })
    }
}

/// Rebalances `items` over `intervals` with the default [`Rebalancer`].
///
/// Returns the change-set and report; applying the new due days is left to
/// the caller.
pub fn rebalance(
    items: &[ScheduledItem],
    intervals: &[u32],
    reschedule_overdue: bool,
    today: i64,
) -> Result<RebalanceOutcome> {
    Rebalancer::new().rebalance(items, intervals, reschedule_overdue, today)
}

/// Prepends the iteration counts of earlier intervals to a cap failure.
fn with_history(err: RebalanceError, history: &[IntervalIterations]) -> RebalanceError {
    match err {
        RebalanceError::NotConverged {
            interval,
            iterations,
            cap,
            counts,
            deviations,
            iterations_by_interval,
        } => RebalanceError::NotConverged {
            interval,
            iterations,
            cap,
            counts,
            deviations,
            iterations_by_interval: history
                .iter()
                .copied()
                .chain(iterations_by_interval)
                .collect(),
        },
        other => other,
    }
}
