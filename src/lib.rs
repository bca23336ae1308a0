//! Due-day load balancing for interval cohorts.
//!
//! Items (flashcards, inspections, recurring jobs) are grouped by a fixed
//! interval and spread over the due days `1..=interval` of that interval.
//! This crate redistributes them so every due day carries the interval's
//! average load, rounded either way, while keeping item displacement small.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `ScheduledItem`, `ItemId`, `Average`,
//!   `Change`, `ChangeSet`
//! - **`balance`**: Bucket model, item mover, per-interval engine and the
//!   `Rebalancer` entry point
//! - **`report`**: Summary metrics and human-readable output
//! - **`eligibility`**: Optional caller-side filtering of raw items
//! - **`error`**: `RebalanceError`
//!
//! # Architecture
//!
//! The core is a pure, synchronous batch computation over an in-memory
//! snapshot. Loading items and persisting the change-set belong to the host.
//!
//! # Example
//!
//! ```
//! use u_rebalance::balance::rebalance;
//! use u_rebalance::models::ScheduledItem;
//!
//! let today = 19_000;
//! let items = vec![
//!     ScheduledItem::new("a", 4, today + 1),
//!     ScheduledItem::new("b", 4, today + 1),
//!     ScheduledItem::new("c", 4, today + 1),
//!     ScheduledItem::new("d", 4, today + 4),
//! ];
//!
//! let outcome = rebalance(&items, &[4], false, today).unwrap();
//! assert_eq!(outcome.changes.len(), 2);
//! for change in outcome.changes.iter() {
//!     println!("{} -> {}", change.item_id, change.new_due);
//! }
//! ```
//!
//! # References
//!
//! - Graham (1969), "Bounds on Multiprocessing Timing Anomalies"
//! - Cybenko (1989), "Dynamic Load Balancing for Distributed Memory Multiprocessors"

pub mod balance;
pub mod eligibility;
pub mod error;
pub mod models;
pub mod report;

pub use balance::{rebalance, RebalanceOutcome, RebalanceRequest, Rebalancer};
pub use error::{RebalanceError, Result};
