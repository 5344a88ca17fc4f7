//! Half-open time intervals and the interval algebra used by the cache layer.
//!
//! All coverage bookkeeping in the local store is expressed as a single
//! half-open interval `[start, end)`. Keeping the stored interval contiguous
//! is what lets the store promise "no holes inside the declared coverage":
//! gap computation always works against the hull of the request and the
//! cached range, so a request disjoint from the cache also fetches the
//! bridging range instead of leaving an interior hole.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open time interval `[start, end)`.
///
/// `end` is exclusive: an interval ending at `2024-09-02 00:00:00` covers all
/// of September 1st and none of September 2nd. Construction enforces
/// `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    /// Inclusive lower bound.
    pub start: NaiveDateTime,
    /// Exclusive upper bound.
    pub end: NaiveDateTime,
}

impl Interval {
    /// Creates an interval, returning `None` when `start >= end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// Whether `ts` falls inside `[start, end)`.
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Whether `other` is fully inside this interval.
    pub fn covers(&self, other: &Interval) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    /// The smallest interval containing both `self` and `other`.
    pub fn hull(&self, other: &Interval) -> Interval {
        Interval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// The sub-intervals of `hull(request, cached)` not covered by `cached`.
    ///
    /// Returns zero, one, or two intervals: the part before the cached range
    /// and the part after it. A request fully inside the cached interval
    /// yields an empty vector; with no cached interval the request itself is
    /// the single gap.
    pub fn gaps_against(&self, cached: Option<&Interval>) -> Vec<Interval> {
        let Some(cached) = cached else {
            return vec![*self];
        };
        let hull = self.hull(cached);
        let mut gaps = Vec::with_capacity(2);
        if let Some(before) = Interval::new(hull.start, cached.start) {
            gaps.push(before);
        }
        if let Some(after) = Interval::new(cached.end, hull.end) {
            gaps.push(after);
        }
        gaps
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
