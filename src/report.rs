//! Rebalancing summary metrics.
//!
//! Derived, read-only reporting over a finished run. Nothing here feeds
//! back into the algorithm.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Changed rate | changed items / rebalanced items |
//! | Mean displacement (changed) | mean of `new - original` over changed items |
//! | Mean displacement (all) | same sum divided by all rebalanced items |
//! | Histogram | changed items per `|new - original|` |
//!
//! Displacements are measured in due days; overdue items count from day 0
//! and over-scheduled items from day `n + 1`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::models::ChangeSet;

/// Per-interval outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalSummary {
    /// Interval length.
    pub interval: u32,
    /// Items rebalanced in this interval.
    pub item_count: usize,
    /// Overdue items filed into day 1.
    pub overdue_count: usize,
    /// Over-scheduled items filed into day `n`.
    pub overscheduled_count: usize,
    /// Overdue items left out of the run.
    pub excluded_overdue: usize,
    /// Average items per due day (2 decimals).
    pub average: f64,
    /// Engine iterations.
    pub iterations: u64,
    /// Iteration cap.
    pub cap: u64,
    /// Item relocations performed by the engine.
    pub moved_items: usize,
    /// Items whose due day changed.
    pub changed_items: usize,
    /// Bucket sizes before rebalancing, day 1 first.
    pub counts_before: Vec<usize>,
    /// Bucket sizes after rebalancing, day 1 first.
    pub counts_after: Vec<usize>,
    /// Bias-corrected deviations before rebalancing, day 1 first.
    pub deviations_before: Vec<i64>,
}

/// Summary of a rebalancing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceReport {
    /// Items that took part in the run.
    pub total_items: usize,
    /// Items with a new due day.
    pub changed_items: usize,
    /// Fraction of items changed (0.0..1.0).
    pub changed_rate: f64,
    /// Mean `|displacement|` over changed items.
    pub mean_abs_displacement_changed: f64,
    /// Mean signed displacement over changed items.
    pub mean_signed_displacement_changed: f64,
    /// Mean `|displacement|` over all items.
    pub mean_abs_displacement_all: f64,
    /// Mean signed displacement over all items.
    pub mean_signed_displacement_all: f64,
    /// Changed items per displacement magnitude (days).
    pub displacement_histogram: BTreeMap<u32, usize>,
    /// Items dropped because their interval was not requested.
    pub skipped_items: usize,
    /// Overdue items left out of the run.
    pub excluded_overdue: usize,
    /// Per-interval outcomes, in processing order.
    pub intervals: Vec<IntervalSummary>,
}

impl RebalanceReport {
    /// Computes the report from the change-set and interval summaries.
    ///
    /// # Arguments
    /// * `changes` - Final change-set of the run.
    /// * `intervals` - Per-interval summaries, in processing order.
    /// * `skipped_items` - Items outside the requested interval set.
    pub fn calculate(
        changes: &ChangeSet,
        intervals: Vec<IntervalSummary>,
        skipped_items: usize,
    ) -> Self {
        let total_items: usize = intervals.iter().map(|s| s.item_count).sum();
        let excluded_overdue = intervals.iter().map(|s| s.excluded_overdue).sum();
        let changed_items = changes.len();

        let mut abs_sum: i64 = 0;
        let mut signed_sum: i64 = 0;
        let mut displacement_histogram = BTreeMap::new();
        for change in changes.iter() {
            let d = change.displacement();
            abs_sum += d.abs();
            signed_sum += d;
            *displacement_histogram
                .entry(d.unsigned_abs() as u32)
                .or_insert(0) += 1;
        }

        let mean = |sum: i64, count: usize| {
            if count == 0 {
                0.0
            } else {
                sum as f64 / count as f64
            }
        };

        Self {
            total_items,
            changed_items,
            changed_rate: if total_items == 0 {
                0.0
            } else {
                changed_items as f64 / total_items as f64
            },
            mean_abs_displacement_changed: mean(abs_sum, changed_items),
            mean_signed_displacement_changed: mean(signed_sum, changed_items),
            mean_abs_displacement_all: mean(abs_sum, total_items),
            mean_signed_displacement_all: mean(signed_sum, total_items),
            displacement_histogram,
            skipped_items,
            excluded_overdue,
            intervals,
        }
    }

    /// Percentage of items changed (0.0..100.0).
    pub fn changed_percentage(&self) -> f64 {
        self.changed_rate * 100.0
    }

    /// Sum of engine iterations over all intervals.
    pub fn total_iterations(&self) -> u64 {
        self.intervals.iter().map(|s| s.iterations).sum()
    }

    /// Summary of one interval.
    pub fn interval(&self, interval: u32) -> Option<&IntervalSummary> {
        self.intervals.iter().find(|s| s.interval == interval)
    }
}

impl fmt::Display for RebalanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Rebalanced {} item(s) across {} interval(s): {} changed ({:.2}%)",
            self.total_items,
            self.intervals.len(),
            self.changed_items,
            self.changed_percentage()
        )?;
        writeln!(
            f,
            "Mean displacement over changed items: {:.2} (signed {:+.2})",
            self.mean_abs_displacement_changed, self.mean_signed_displacement_changed
        )?;
        writeln!(
            f,
            "Mean displacement over all items: {:.2} (signed {:+.2})",
            self.mean_abs_displacement_all, self.mean_signed_displacement_all
        )?;
        if self.skipped_items > 0 || self.excluded_overdue > 0 {
            writeln!(
                f,
                "Skipped {} item(s) outside the interval set, {} overdue item(s) left as is",
                self.skipped_items, self.excluded_overdue
            )?;
        }
        for (days, count) in &self.displacement_histogram {
            writeln!(f, "  moved by {days} day(s): {count}")?;
        }
        for summary in &self.intervals {
            write!(f, "\n{summary}")?;
        }
        Ok(())
    }
}

impl fmt::Display for IntervalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Interval {}: {} item(s), average {:.2}, {} iteration(s) of at most {}, {} changed",
            self.interval,
            self.item_count,
            self.average,
            self.iterations,
            self.cap,
            self.changed_items
        )?;
        if self.overdue_count > 0 || self.overscheduled_count > 0 {
            writeln!(
                f,
                "  {} overdue, {} over-scheduled",
                self.overdue_count, self.overscheduled_count
            )?;
        }
        let rows = self
            .counts_before
            .iter()
            .zip(&self.counts_after)
            .zip(&self.deviations_before);
        for (day, ((before, after), deviation)) in (1u32..).zip(rows) {
            writeln!(
                f,
                "  day {day}: {before} -> {after} (deviation {deviation:+})"
            )?;
        }
        Ok(())
    }
}
