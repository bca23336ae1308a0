//! Per-interval average load and deviation arithmetic.
//!
//! The average number of items per due day is a rational `total / days`.
//! It is kept in three forms: the exact fraction (all arithmetic), a
//! 2-decimal value (reporting), and a round-half-to-even integer
//! (bias correction).
//!
//! # Bias Correction
//!
//! With `k = floor(total / days)` and a non-zero fractional part, a balanced
//! interval holds `k` or `k + 1` items on every day. The plain rounded
//! difference `count - round(avg)` would flag one of those two counts as
//! off by one. The correction depends on the rounding direction:
//!
//! | Rounding | Adjustment |
//! |----------|-----------|
//! | down (`round(avg) < avg`) | positive differences − 1 |
//! | up (`round(avg) > avg`) | negative differences + 1 |
//! | exact | none |
//!
//! Both directions give `count - k` for `count <= k` and
//! `count - (k + 1)` for `count > k`, so a fractional part of exactly 0.5
//! yields the same deviations whichever way it was rounded.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Average number of items per due day of one interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Average {
    /// Items assigned to the interval.
    pub total: u64,
    /// Number of due days (the interval length).
    pub days: u32,
    /// `total / days` rounded to two decimals.
    pub value: f64,
    /// `total / days` rounded half to even.
    pub rounded: i64,
}

impl Average {
    /// Computes the average of `total` items over `days` due days.
    ///
    /// `days` must be at least 1; callers validate intervals beforehand.
    pub fn new(total: u64, days: u32) -> Self {
        let d = u64::from(days.max(1));
        let quotient = total / d;
        let twice_remainder = 2 * (total % d);
        let rounded = match twice_remainder.cmp(&d) {
            Ordering::Less => quotient,
            Ordering::Greater => quotient + 1,
            Ordering::Equal if quotient % 2 == 0 => quotient,
            Ordering::Equal => quotient + 1,
        };
        let value = ((total as f64 / d as f64) * 100.0).round() / 100.0;

        Self {
            total,
            days: days.max(1),
            value,
            rounded: rounded as i64,
        }
    }

    /// `floor(total / days)`.
    #[inline]
    pub fn floor(&self) -> i64 {
        (self.total / u64::from(self.days)) as i64
    }

    /// Whether `days` divides `total`.
    #[inline]
    pub fn is_integral(&self) -> bool {
        self.total % u64::from(self.days) == 0
    }

    /// Direction of the integer rounding relative to the exact value.
    ///
    /// `Less` means the integer is below the exact average.
    pub fn rounding(&self) -> Ordering {
        if self.is_integral() {
            Ordering::Equal
        } else if self.rounded == self.floor() {
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }

    /// Bias-corrected deviation of a bucket holding `count` items.
    ///
    /// Zero exactly when the bucket is at a balanced size.
    pub fn deviation(&self, count: usize) -> i64 {
        let base = count as i64 - self.rounded;
        match self.rounding() {
            Ordering::Less if base > 0 => base - 1,
            Ordering::Greater if base < 0 => base + 1,
            _ => base,
        }
    }

    /// Unrounded deviation `count - avg`, scaled by `days` to stay integral.
    ///
    /// Preserves the ordering and sign of the real-valued deviation.
    #[inline]
    pub fn scaled_raw_deviation(&self, count: usize) -> i64 {
        count as i64 * i64::from(self.days) - self.total as i64
    }

    /// Unrounded deviation `count - avg` as a float, for reporting.
    pub fn raw_deviation(&self, count: usize) -> f64 {
        self.scaled_raw_deviation(count) as f64 / f64::from(self.days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integral_average() {
        let avg = Average::new(12, 4);
        assert_eq!(avg.rounded, 3);
        assert!((avg.value - 3.0).abs() < 1e-10);
        assert!(avg.is_integral());
        assert_eq!(avg.rounding(), Ordering::Equal);
        assert_eq!(avg.deviation(5), 2);
        assert_eq!(avg.deviation(3), 0);
        assert_eq!(avg.deviation(1), -2);
    }

    #[test]
    fn test_two_decimal_value() {
        let avg = Average::new(10, 3);
        assert!((avg.value - 3.33).abs() < 1e-10);
        assert_eq!(avg.rounded, 3);
        assert_eq!(avg.floor(), 3);
    }

    #[test]
    fn test_rounded_down_decrements_positive() {
        // 10 / 3 = 3.33 -> rounded down to 3
        let avg = Average::new(10, 3);
        assert_eq!(avg.rounding(), Ordering::Less);
        assert_eq!(avg.deviation(4), 0);
        assert_eq!(avg.deviation(3), 0);
        assert_eq!(avg.deviation(5), 1);
        assert_eq!(avg.deviation(2), -1);
    }

    #[test]
    fn test_rounded_up_increments_negative() {
        // 11 / 3 = 3.67 -> rounded up to 4
        let avg = Average::new(11, 3);
        assert_eq!(avg.rounding(), Ordering::Greater);
        assert_eq!(avg.deviation(3), 0);
        assert_eq!(avg.deviation(4), 0);
        assert_eq!(avg.deviation(5), 1);
        assert_eq!(avg.deviation(2), -1);
    }

    #[test]
    fn test_half_rounds_to_even_consistently() {
        // 5 / 2 = 2.5 -> 2 (even); 7 / 2 = 3.5 -> 4 (even)
        let low = Average::new(5, 2);
        let high = Average::new(7, 2);
        assert_eq!(low.rounded, 2);
        assert_eq!(high.rounded, 4);

        // Balanced sizes are floor and floor + 1 in both cases.
        assert_eq!(low.deviation(2), 0);
        assert_eq!(low.deviation(3), 0);
        assert_eq!(low.deviation(1), -1);
        assert_eq!(low.deviation(4), 1);
        assert_eq!(high.deviation(3), 0);
        assert_eq!(high.deviation(4), 0);
        assert_eq!(high.deviation(2), -1);
        assert_eq!(high.deviation(5), 1);
    }

    #[test]
    fn test_value_rounding_does_not_hide_remainder() {
        // 2999 / 1000 displays as 3.00 but one day must hold 2 items.
        let avg = Average::new(2999, 1000);
        assert!((avg.value - 3.0).abs() < 1e-10);
        assert!(!avg.is_integral());
        assert_eq!(avg.deviation(2), 0);
        assert_eq!(avg.deviation(3), 0);
    }

    #[test]
    fn test_scaled_raw_deviation() {
        let avg = Average::new(10, 4); // 2.5
        assert_eq!(avg.scaled_raw_deviation(3), 2);
        assert_eq!(avg.scaled_raw_deviation(2), -2);
        assert!((avg.raw_deviation(3) - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_empty_interval() {
        let avg = Average::new(0, 5);
        assert_eq!(avg.rounded, 0);
        assert_eq!(avg.deviation(0), 0);
        assert!(avg.is_integral());
    }
}
