//! Error taxonomy for a rebalancing run.
//!
//! Every variant signals a broken invariant in the input data or in the
//! bucket bookkeeping. None of them is transient: a run that fails is
//! aborted and the error carries enough state to diagnose it.

use serde::{Deserialize, Serialize};

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RebalanceError>;

/// Iteration count recorded for one processed interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalIterations {
    /// Interval (cohort length in days).
    pub interval: u32,
    /// Engine iterations spent on it.
    pub iterations: u64,
}

/// A fatal rebalancing error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RebalanceError {
    /// An item cannot be placed into a due-day bucket of its interval.
    #[error(
        "cannot classify item '{item_id}' (interval {interval}, due {due}, today {today}): {reason}"
    )]
    Classification {
        /// Caller-provided item identifier.
        item_id: String,
        /// Interval of the item.
        interval: u32,
        /// Absolute due day of the item.
        due: i64,
        /// Day origin the run was started with.
        today: i64,
        /// What went wrong.
        reason: String,
    },

    /// A move asked for more items than the origin bucket could supply.
    #[error(
        "interval {interval}: cannot move {amount} item(s) from day {origin} to day {target}, found {found}"
    )]
    MoveAccounting {
        /// Interval being rebalanced.
        interval: u32,
        /// Requested number of items.
        amount: usize,
        /// Origin due day.
        origin: u32,
        /// Target due day.
        target: u32,
        /// Candidates actually found.
        found: usize,
    },

    /// An interval exceeded its iteration cap without converging.
    #[error(
        "interval {interval} did not converge after {iterations} iterations (cap {cap}); counts {counts:?}, deviations {deviations:?}"
    )]
    NotConverged {
        /// Interval being rebalanced.
        interval: u32,
        /// Iterations performed.
        iterations: u64,
        /// Iteration cap of the interval.
        cap: u64,
        /// Working bucket sizes, day 1 first.
        counts: Vec<usize>,
        /// Bias-corrected deviations, day 1 first.
        deviations: Vec<i64>,
        /// Iterations of every interval processed in this run, this one last.
        iterations_by_interval: Vec<IntervalIterations>,
    },

    /// The requested interval set contains a zero-length interval.
    #[error("invalid interval {interval}: intervals must be at least 1 day")]
    InvalidInterval {
        /// Offending interval.
        interval: u32,
    },
}
