//! Highest-deviation rebalancing engine for one interval.
//!
//! # Algorithm
//!
//! Each iteration scans the bias-corrected deviations of days `1..=n`:
//!
//! 1. `max_day`/`max_diff`: highest positive deviation, first day wins ties.
//!    `min_day`/`min_diff`: most negative deviation, first day wins ties.
//! 2. Both within `(-1, 1)` → converged.
//! 3. `max_diff < 2` → single-item correction: find the most negative
//!    unrounded deviation, then the highest unrounded positive deviation
//!    nearest to it, and move one item one day toward the deficit.
//! 4. Otherwise bulk correction: move `max_diff` items from `max_day` to its
//!    neighbours (all to the only neighbour at either end, split in half
//!    in the middle).
//!
//! Deviations are recomputed from the working buckets before every scan.
//!
//! # Termination
//! Bulk moves halve an excess at every split and single-item moves walk
//! one unit toward a deficit, so the number of iterations is polynomial in
//! `n`. The cap is `factor · n³ · (1 + bit_length(items))`; exceeding it
//! is reported as [`RebalanceError::NotConverged`].

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use super::{mover, IntervalBuckets};
use crate::error::{IntervalIterations, RebalanceError, Result};

/// Which neighbour receives the odd item of a bulk split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitBias {
    /// Odd item goes to `max_day + 1` (default).
    #[default]
    Later,
    /// Odd item goes to `max_day - 1`.
    Earlier,
}

/// Engine state for one interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Imbalance remains; more iterations are needed.
    Iterating,
    /// Every due day is at a balanced size.
    Converged,
    /// The iteration cap was reached before convergence.
    Failed,
}

/// Largest positive and most negative deviation of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Extremes {
    max_day: u32,
    max_diff: i64,
    min_day: u32,
    min_diff: i64,
}

impl Extremes {
    /// Scans deviations of days `1..=n`; ties keep the earlier day.
    fn scan(deviations: &[i64]) -> Self {
        let mut ext = Self {
            max_day: 1,
            max_diff: 0,
            min_day: 1,
            min_diff: 0,
        };
        for (day, &d) in (1u32..).zip(deviations) {
            if d > ext.max_diff {
                ext.max_day = day;
                ext.max_diff = d;
            }
            if d < ext.min_diff {
                ext.min_day = day;
                ext.min_diff = d;
            }
        }
        ext
    }

    fn converged(&self) -> bool {
        self.max_diff < 1 && self.min_diff > -1
    }
}

/// Iteration cap for an interval of `interval` days holding `items` items.
pub fn iteration_cap(interval: u32, items: usize, factor: u64) -> u64 {
    let n = u64::from(interval);
    let bits = u64::from(usize::BITS - items.leading_zeros());
    factor
        .saturating_mul(n.saturating_pow(3))
        .saturating_mul(1 + bits)
        .max(1)
}

/// Drives the rebalancing of one interval's working buckets.
#[derive(Debug)]
pub struct IntervalEngine<'a> {
    buckets: &'a mut IntervalBuckets,
    split_bias: SplitBias,
    cap: u64,
    iterations: u64,
    moved: usize,
    state: EngineState,
}

impl<'a> IntervalEngine<'a> {
    /// Creates an engine over `buckets` with an explicit iteration cap.
    pub fn new(buckets: &'a mut IntervalBuckets, split_bias: SplitBias, cap: u64) -> Self {
        Self {
            buckets,
            split_bias,
            cap,
            iterations: 0,
            moved: 0,
            state: EngineState::Iterating,
        }
    }

    /// Current state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Iterations performed so far.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Item relocations performed so far (an item moved twice counts twice).
    pub fn moved_items(&self) -> usize {
        self.moved
    }

    /// Iteration cap of this engine.
    pub fn cap(&self) -> u64 {
        self.cap
    }

    /// Runs iterations until the interval converges.
    ///
    /// # Errors
    /// [`RebalanceError::NotConverged`] when the cap is reached, or any
    /// [`RebalanceError::MoveAccounting`] raised by a move.
    pub fn run(&mut self) -> Result<EngineState> {
        let interval = self.buckets.interval();
        debug!(
            "interval {interval}: rebalancing {} item(s), average {:.2}, cap {}",
            self.buckets.len(),
            self.buckets.average().value,
            self.cap
        );

        while self.step()? == EngineState::Iterating {}

        if self.state == EngineState::Failed {
            warn!(
                "interval {interval}: no convergence after {} iterations",
                self.iterations
            );
            return Err(RebalanceError::NotConverged {
                interval,
                iterations: self.iterations,
                cap: self.cap,
                counts: self.buckets.counts(),
                deviations: self.buckets.deviations(),
                iterations_by_interval: vec![IntervalIterations {
                    interval,
                    iterations: self.iterations,
                }],
            });
        }

        debug!(
            "interval {interval}: converged after {} iteration(s), {} item move(s)",
            self.iterations, self.moved
        );
        Ok(self.state)
    }

    /// Performs one iteration and returns the resulting state.
    pub fn step(&mut self) -> Result<EngineState> {
        if self.state != EngineState::Iterating {
            return Ok(self.state);
        }

        let extremes = Extremes::scan(&self.buckets.deviations());
        trace!(
            "interval {}: max {:+} on day {}, min {:+} on day {}",
            self.buckets.interval(),
            extremes.max_diff,
            extremes.max_day,
            extremes.min_diff,
            extremes.min_day
        );
        if extremes.converged() {
            self.state = EngineState::Converged;
            return Ok(self.state);
        }
        if self.iterations >= self.cap {
            self.state = EngineState::Failed;
            return Ok(self.state);
        }
        self.iterations += 1;

        if extremes.max_diff < 2 {
            self.correct_single()?;
        } else {
            self.correct_bulk(extremes.max_day, extremes.max_diff as usize)?;
        }
        Ok(self.state)
    }

    /// Moves one item from the nearest largest surplus toward the deepest deficit.
    fn correct_single(&mut self) -> Result<()> {
        let interval = self.buckets.interval();
        let raw = self.buckets.scaled_raw_deviations();

        let mut deficit: Option<(u32, i64)> = None;
        for (day, &r) in (1u32..).zip(&raw) {
            if r < deficit.map_or(0, |(_, best)| best) {
                deficit = Some((day, r));
            }
        }

        let mut surplus: Option<(u32, i64, u32)> = None;
        if let Some((min_day, _)) = deficit {
            for (day, &r) in (1u32..).zip(&raw) {
                if r <= 0 {
                    continue;
                }
                let distance = day.abs_diff(min_day);
                let better = match surplus {
                    None => true,
                    Some((_, best, best_distance)) => {
                        r > best || (r == best && distance < best_distance)
                    }
                };
                if better {
                    surplus = Some((day, r, distance));
                }
            }
        }

        let (Some((min_day, _)), Some((source, _, _))) = (deficit, surplus) else {
            let day = deficit.map_or(1, |(d, _)| d);
            return Err(RebalanceError::MoveAccounting {
                interval,
                amount: 1,
                origin: day,
                target: day,
                found: 0,
            });
        };

        let target = if source < min_day { source + 1 } else { source - 1 };
        self.relocate(1, source, target)?;
        Ok(())
    }

    /// Spreads `amount` items from `max_day` to its neighbours.
    fn correct_bulk(&mut self, max_day: u32, amount: usize) -> Result<()> {
        let n = self.buckets.interval();
        if max_day == 1 {
            self.relocate(amount, 1, 2)?;
        } else if max_day == n {
            self.relocate(amount, n, n - 1)?;
        } else {
            let half = amount / 2;
            let rest = amount - half;
            let (earlier, later) = match self.split_bias {
                SplitBias::Later => (half, rest),
                SplitBias::Earlier => (rest, half),
            };
            self.relocate(earlier, max_day, max_day - 1)?;
            self.relocate(later, max_day, max_day + 1)?;
        }
        Ok(())
    }

    fn relocate(&mut self, amount: usize, origin: u32, target: u32) -> Result<usize> {
        let moved = mover::move_items(self.buckets, amount, origin, target)?;
        self.moved += moved;
        Ok(moved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemId, ScheduledItem};

    fn build(interval: u32, dues: &[i64]) -> IntervalBuckets {
        let items: Vec<ScheduledItem> = dues
            .iter()
            .enumerate()
            .map(|(i, &d)| ScheduledItem::new(format!("C{i}"), interval, d))
            .collect();
        IntervalBuckets::build(
            interval,
            items.iter().enumerate().map(|(i, it)| (ItemId(i), it)),
            0,
            true,
        )
        .unwrap()
    }

    fn run(buckets: &mut IntervalBuckets) -> (EngineState, u64) {
        let cap = iteration_cap(buckets.interval(), buckets.len(), 1);
        let mut engine = IntervalEngine::new(buckets, SplitBias::Later, cap);
        let state = engine.run().unwrap();
        (state, engine.iterations())
    }

    #[test]
    fn test_extremes_first_found_wins() {
        let ext = Extremes::scan(&[2, -1, 2, -1]);
        assert_eq!(ext.max_day, 1);
        assert_eq!(ext.max_diff, 2);
        assert_eq!(ext.min_day, 2);
        assert_eq!(ext.min_diff, -1);
        assert!(!ext.converged());
        assert!(Extremes::scan(&[0, 0, 0]).converged());
    }

    #[test]
    fn test_iteration_cap() {
        assert_eq!(iteration_cap(3, 0, 1), 27);
        assert_eq!(iteration_cap(3, 3, 1), 27 * 3);
        assert_eq!(iteration_cap(1, 0, 1), 1);
        assert_eq!(iteration_cap(0, 0, 1), 1);
        assert_eq!(iteration_cap(2, 1, 2), 2 * 8 * 2);
    }

    #[test]
    fn test_already_balanced() {
        let mut b = build(3, &[1, 2, 3]);
        let (state, iterations) = run(&mut b);
        assert_eq!(state, EngineState::Converged);
        assert_eq!(iterations, 0);
    }

    #[test]
    fn test_interval_four_scenario() {
        let mut b = build(4, &[1, 1, 1, 4]);
        let (state, iterations) = run(&mut b);
        assert_eq!(state, EngineState::Converged);
        assert_eq!(iterations, 2);
        assert_eq!(b.counts(), vec![1, 1, 1, 1]);
        assert_eq!(b.bucket(2), &[ItemId(1)]);
        assert_eq!(b.bucket(3), &[ItemId(0)]);
    }

    #[test]
    fn test_interval_three_scenario() {
        let mut b = build(3, &[1, 1, 1]);
        let (state, _) = run(&mut b);
        assert_eq!(state, EngineState::Converged);
        assert_eq!(b.counts(), vec![1, 1, 1]);
    }

    #[test]
    fn test_bulk_split_middle() {
        // Due 5 is over-scheduled for n = 3 and filed on day 3: [0, 5, 2].
        // avg 2.33 -> day 2 deviation 5 - 3 = 2, split 1 / 1.
        let mut b = build(3, &[2, 2, 2, 2, 2, 5, 5]);
        let mut engine = IntervalEngine::new(&mut b, SplitBias::Later, 100);
        assert_eq!(engine.step().unwrap(), EngineState::Iterating);
        assert_eq!(engine.moved_items(), 2);
        drop(engine);
        assert_eq!(b.counts(), vec![1, 3, 3]);
    }

    #[test]
    fn test_split_bias_odd_remainder() {
        // 7 items on day 3 of 5: avg 1.4, deviation 7 - 2 = 5.
        let dues = [3, 3, 3, 3, 3, 3, 3];
        let mut later = build(5, &dues);
        IntervalEngine::new(&mut later, SplitBias::Later, 100).step().unwrap();
        assert_eq!(later.counts(), vec![0, 2, 2, 3, 0]);

        let mut earlier = build(5, &dues);
        IntervalEngine::new(&mut earlier, SplitBias::Earlier, 100).step().unwrap();
        assert_eq!(earlier.counts(), vec![0, 3, 2, 2, 0]);
    }

    #[test]
    fn test_last_day_bulk() {
        let mut b = build(3, &[3, 3, 3]);
        let mut engine = IntervalEngine::new(&mut b, SplitBias::Later, 100);
        engine.step().unwrap();
        drop(engine);
        assert_eq!(b.counts(), vec![0, 2, 1]);
    }

    #[test]
    fn test_single_item_walks_toward_deficit() {
        // avg 1: [2, 1, 0] -> max 1, single-item path moves day 1 -> day 2.
        let mut b = build(3, &[1, 1, 2]);
        let mut engine = IntervalEngine::new(&mut b, SplitBias::Later, 100);
        engine.step().unwrap();
        assert_eq!(engine.moved_items(), 1);
        drop(engine);
        assert_eq!(b.counts(), vec![1, 2, 0]);
    }

    #[test]
    fn test_single_item_prefers_nearest_surplus() {
        // avg 1: [2, 0, 1, 1, 0, 2] -> deficit first at day 2; surplus day 1
        // (distance 1) beats day 6 (distance 4).
        let mut b = build(6, &[1, 1, 3, 4, 6, 6]);
        let mut engine = IntervalEngine::new(&mut b, SplitBias::Later, 100);
        engine.step().unwrap();
        drop(engine);
        assert_eq!(b.counts(), vec![1, 1, 1, 1, 0, 2]);
    }

    #[test]
    fn test_fractional_average_converges() {
        // 10 items over 4 days: balanced sizes are 2 and 3.
        let mut b = build(4, &[1, 1, 1, 1, 1, 1, 1, 1, 1, 4]);
        let (state, _) = run(&mut b);
        assert_eq!(state, EngineState::Converged);
        assert!(b.counts().iter().all(|&c| c == 2 || c == 3));
        assert_eq!(b.counts().iter().sum::<usize>(), 10);
    }

    #[test]
    fn test_cap_exceeded_reports_state() {
        let mut b = build(3, &[1, 1, 1, 1, 1, 1]);
        let mut engine = IntervalEngine::new(&mut b, SplitBias::Later, 1);
        let err = engine.run().unwrap_err();
        assert_eq!(engine.state(), EngineState::Failed);
        match err {
            RebalanceError::NotConverged {
                interval,
                iterations,
                cap,
                counts,
                iterations_by_interval,
                ..
            } => {
                assert_eq!(interval, 3);
                assert_eq!(iterations, 1);
                assert_eq!(cap, 1);
                assert_eq!(counts.iter().sum::<usize>(), 6);
                assert_eq!(iterations_by_interval.len(), 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_single_day_interval() {
        let mut b = build(1, &[1, 1, 1, 5]);
        let (state, iterations) = run(&mut b);
        assert_eq!(state, EngineState::Converged);
        assert_eq!(iterations, 0);
    }
}
