//! Minimal-displacement item mover.
//!
//! # Algorithm
//!
//! 1. Clamp the requested amount to the size of the origin bucket.
//! 2. Group origin items by `|target - original_due_day|`.
//! 3. Take items group by group, nearest first; within a group take them
//!    in bucket order (first seen, first considered).
//! 4. Remove the selected items from the origin and append them to the
//!    target, keeping their relative order.
//!
//! Distances are measured against the *original* assignment, so an item
//! pushed away earlier in the run is the first to come back.
//!
//! # Complexity
//! O(b · n) where b = origin bucket size, n = interval length.

use log::{trace, warn};

use super::IntervalBuckets;
use crate::error::{RebalanceError, Result};
use crate::models::ItemId;

/// Moves up to `amount` items from day `origin` to day `target`.
///
/// Returns the number of items actually moved; an empty origin bucket is a
/// silent no-op returning 0.
///
/// # Errors
/// [`RebalanceError::MoveAccounting`] if the distance search over
/// `0..=interval + 1` cannot supply the clamped amount.
pub fn move_items(
    buckets: &mut IntervalBuckets,
    amount: usize,
    origin: u32,
    target: u32,
) -> Result<usize> {
    let interval = buckets.interval();
    let amount = amount.min(buckets.bucket(origin).len());
    if amount == 0 || origin == target {
        return Ok(0);
    }

    let selected = select_nearest(buckets, amount, origin, target);
    if selected.len() < amount {
        warn!(
            "interval {interval}: {} of {amount} candidates found moving day {origin} -> {target}",
            selected.len()
        );
        return Err(RebalanceError::MoveAccounting {
            interval,
            amount,
            origin,
            target,
            found: selected.len(),
        });
    }

    let mut chosen = vec![false; buckets.bucket(origin).len()];
    for &pos in &selected {
        chosen[pos] = true;
    }

    let source = std::mem::take(buckets.bucket_mut(origin));
    let mut kept = Vec::with_capacity(source.len() - amount);
    let mut moving: Vec<ItemId> = Vec::with_capacity(amount);
    for (pos, id) in source.into_iter().enumerate() {
        if chosen[pos] {
            moving.push(id);
        } else {
            kept.push(id);
        }
    }
    *buckets.bucket_mut(origin) = kept;
    buckets.bucket_mut(target).extend(moving);

    trace!("interval {interval}: moved {amount} item(s) day {origin} -> {target}");
    Ok(amount)
}

/// Positions in the origin bucket of the `amount` items nearest to `target`.
///
/// Nearest by original due day, ties resolved by bucket position.
fn select_nearest(buckets: &IntervalBuckets, amount: usize, origin: u32, target: u32) -> Vec<usize> {
    let source = buckets.bucket(origin);
    let distances: Vec<u32> = source
        .iter()
        .map(|&id| {
            buckets
                .original_due_day(id)
                .map_or(u32::MAX, |day| day.abs_diff(target))
        })
        .collect();

    let mut selected = Vec::with_capacity(amount);
    for distance in 0..=buckets.interval() + 1 {
        for (pos, _) in distances.iter().enumerate().filter(|&(_, &d)| d == distance) {
            selected.push(pos);
            if selected.len() == amount {
                return selected;
            }
        }
    }
    selected
}
