//! Property tests for the rebalancing pipeline.

use std::collections::HashMap;

use proptest::prelude::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use u_rebalance::balance::{classify, mover, IntervalBuckets};
use u_rebalance::models::{Average, ItemId, ScheduledItem};
use u_rebalance::{rebalance, RebalanceOutcome};

const TODAY: i64 = 19_000;

fn make_items(interval: u32, offsets: &[i64]) -> Vec<ScheduledItem> {
    offsets
        .iter()
        .enumerate()
        .map(|(i, &d)| ScheduledItem::new(format!("I{i}"), interval, TODAY + d))
        .collect()
}

/// Final working day of every item taking part in the run.
fn final_days(
    items: &[ScheduledItem],
    interval: u32,
    reschedule_overdue: bool,
    outcome: &RebalanceOutcome,
) -> HashMap<ItemId, u32> {
    let mut days = HashMap::new();
    for (i, item) in items.iter().enumerate() {
        let id = ItemId(i);
        let placement = classify(item, interval, TODAY).unwrap();
        if placement.is_overdue() && !reschedule_overdue {
            assert!(outcome.changes.get(id).is_none());
            continue;
        }
        let day = outcome
            .changes
            .get(id)
            .map_or(placement.bucket, |c| c.new_due_day);
        days.insert(id, day);
    }
    days
}

fn scenario() -> impl Strategy<Value = (u32, Vec<i64>, bool)> {
    (1u32..=12).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec(-3i64..=i64::from(n) + 3, 0..80),
            any::<bool>(),
        )
    })
}

proptest! {
    #[test]
    fn prop_conservation_and_balance((n, offsets, reschedule) in scenario()) {
        let items = make_items(n, &offsets);
        let outcome = rebalance(&items, &[n], reschedule, TODAY).unwrap();
        let summary = outcome.report.interval(n).unwrap();

        let days = final_days(&items, n, reschedule, &outcome);
        prop_assert_eq!(days.len(), summary.item_count);

        let mut counts = vec![0usize; n as usize];
        for &day in days.values() {
            prop_assert!(day >= 1 && day <= n);
            counts[(day - 1) as usize] += 1;
        }
        prop_assert_eq!(&counts, &summary.counts_after);
        prop_assert_eq!(
            summary.counts_before.iter().sum::<usize>(),
            summary.counts_after.iter().sum::<usize>()
        );

        let avg = Average::new(summary.item_count as u64, n);
        for &c in &summary.counts_after {
            prop_assert_eq!(avg.deviation(c), 0);
            prop_assert!((c as f64 - summary.item_count as f64 / f64::from(n)).abs() < 1.0);
        }
        prop_assert!(summary.iterations <= summary.cap);
    }

    #[test]
    fn prop_idempotent((n, offsets, reschedule) in scenario()) {
        let items = make_items(n, &offsets);
        let first = rebalance(&items, &[n], reschedule, TODAY).unwrap();

        let applied: Vec<ScheduledItem> = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let mut next = item.clone();
                if let Some(due) = first.changes.new_due(ItemId(i)) {
                    next.due = due;
                }
                next
            })
            .collect();

        let second = rebalance(&applied, &[n], reschedule, TODAY).unwrap();
        prop_assert!(second.changes.is_empty());
        prop_assert_eq!(second.report.total_iterations(), 0);
    }

    #[test]
    fn prop_deterministic((n, offsets, reschedule) in scenario()) {
        let items = make_items(n, &offsets);
        let a = rebalance(&items, &[n], reschedule, TODAY).unwrap();
        let b = rebalance(&items, &[n], reschedule, TODAY).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.report.to_string(), b.report.to_string());
    }

    #[test]
    fn prop_skewed_large_counts_converge(n in 2u32..=6, pile in 50usize..400, day in 1i64..=6) {
        let offsets = vec![day.min(i64::from(n)); pile];
        let items = make_items(n, &offsets);
        let outcome = rebalance(&items, &[n], false, TODAY).unwrap();
        let summary = outcome.report.interval(n).unwrap();
        let max = summary.counts_after.iter().max().copied().unwrap_or(0);
        let min = summary.counts_after.iter().min().copied().unwrap_or(0);
        prop_assert!(max - min <= 1);
    }
}

#[test]
fn test_multiple_intervals_independent() {
    let mut items = make_items(3, &[1, 1, 1]);
    items.extend(
        make_items(5, &[2, 2, 2, 2, 2])
            .into_iter()
            .map(|mut i| {
                i.id = format!("five-{}", i.id);
                i
            }),
    );
    let together = rebalance(&items, &[3, 5], false, TODAY).unwrap();
    let alone = rebalance(&items[3..], &[5], false, TODAY).unwrap();

    let together_five: Vec<(String, u32)> = together
        .changes
        .for_interval(5)
        .map(|c| (c.item_id.clone(), c.new_due_day))
        .collect();
    let alone_five: Vec<(String, u32)> = alone
        .changes
        .iter()
        .map(|c| (c.item_id.clone(), c.new_due_day))
        .collect();
    assert_eq!(together_five, alone_five);
}

/// Single-item moves pick an item at minimal original distance to the target,
/// the first such item in bucket order.
#[test]
fn test_single_move_minimal_displacement_brute_force() {
    let mut rng = SmallRng::seed_from_u64(42);

    for _ in 0..300 {
        let n: u32 = rng.random_range(2..=9);
        let count: usize = rng.random_range(1..=30);
        let offsets: Vec<i64> = (0..count)
            .map(|_| rng.random_range(-2..=i64::from(n) + 2))
            .collect();
        let items = make_items(n, &offsets);
        let mut buckets = IntervalBuckets::build(
            n,
            items.iter().enumerate().map(|(i, it)| (ItemId(i), it)),
            TODAY,
            true,
        )
        .unwrap();

        // Scramble with random adjacent moves so buckets mix original days.
        for _ in 0..20 {
            let origin: u32 = rng.random_range(1..=n);
            let target = if origin == n || (origin > 1 && rng.random_bool(0.5)) {
                origin - 1
            } else {
                origin + 1
            };
            let amount: usize = rng.random_range(1..=3);
            mover::move_items(&mut buckets, amount, origin, target).unwrap();
        }

        let origin: u32 = rng.random_range(1..=n);
        if buckets.bucket(origin).is_empty() {
            continue;
        }
        let target = if origin == n { origin - 1 } else { origin + 1 };
        let candidates: Vec<ItemId> = buckets.bucket(origin).to_vec();
        let distance = |id: ItemId| buckets.original_due_day(id).unwrap().abs_diff(target);
        let best = candidates.iter().map(|&id| distance(id)).min().unwrap();
        let expected = *candidates.iter().find(|&&id| distance(id) == best).unwrap();

        assert_eq!(mover::move_items(&mut buckets, 1, origin, target).unwrap(), 1);
        let chosen = *buckets.bucket(target).last().unwrap();
        assert_eq!(chosen, expected);
        assert_eq!(buckets.original_due_day(chosen).unwrap().abs_diff(target), best);
    }
}
