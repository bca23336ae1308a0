//! Rebalancing domain models.
//!
//! Provides the value types exchanged with the caller: the input items,
//! the per-interval average, and the resulting change-set.
//!
//! # Domain Mappings
//!
//! | u-rebalance | Spaced repetition | Maintenance | Publishing |
//! |-------------|------------------|-------------|------------|
//! | ScheduledItem | Card | Inspection | Post |
//! | Interval | Review interval | Service cycle | Posting cadence |
//! | Due day | Next review day | Next inspection day | Slot in cycle |

mod average;
mod change_set;
mod item;

pub use average::Average;
pub use change_set::{Change, ChangeSet};
pub use item::{ItemId, ScheduledItem};
