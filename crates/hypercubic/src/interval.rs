use core::fmt;
use serde::{Deserialize, Serialize};

/// -------------------
/// Interval
/// -------------------
/// One dimension of a hypercube: bounds plus whether each endpoint is included.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub low: f64,
    pub high: f64,
    pub lower_closed: bool,
    pub upper_closed: bool,
}

impl Default for Interval {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl Interval {
    pub fn new(low: f64, high: f64, lower_closed: bool, upper_closed: bool) -> Self {
        debug_assert!(low <= high, "interval bounds out of order: {low} > {high}");
        Self {
            low,
            high,
            lower_closed,
            upper_closed,
        }
    }

    pub fn closed(low: f64, high: f64) -> Self {
        Self::new(low, high, true, true)
    }

    /// `[low, high)`
    pub fn half_open(low: f64, high: f64) -> Self {
        Self::new(low, high, true, false)
    }

    pub fn unbounded() -> Self {
        Self::closed(f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn point(value: f64) -> Self {
        Self::closed(value, value)
    }

    pub fn contains(&self, x: f64) -> bool {
        let lower_check = if self.lower_closed {
            x >= self.low
        } else {
            x > self.low
        };
        let upper_check = if self.upper_closed {
            x <= self.high
        } else {
            x < self.high
        };
        lower_check && upper_check
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    pub fn center(&self) -> f64 {
        (self.low + self.high) / 2.0
    }

    pub fn is_bounded(&self) -> bool {
        self.low.is_finite() && self.high.is_finite()
    }

    /// Distance from `x` to the nearest point of the interval, zero inside.
    pub fn distance(&self, x: f64) -> f64 {
        if x < self.low {
            self.low - x
        } else if x > self.high {
            x - self.high
        } else {
            0.0
        }
    }

    /// Split at `point`: the left part is open at `point`, the right part closed.
    pub fn split(&self, point: f64) -> (Self, Self) {
        let point = point.clamp(self.low, self.high);
        let left = Interval {
            low: self.low,
            high: point,
            lower_closed: self.lower_closed,
            upper_closed: false,
        };
        let right = Interval {
            low: point,
            high: self.high,
            lower_closed: true,
            upper_closed: self.upper_closed,
        };
        (left, right)
    }

    /// `n` equal-width bins covering the interval; the last bin keeps the upper closure.
    pub fn bins(&self, n: usize) -> Vec<Self> {
        let n = n.max(1);
        let step = self.width() / n as f64;
        (0..n)
            .map(|i| {
                let low = if i == 0 {
                    self.low
                } else {
                    self.low + step * i as f64
                };
                let last = i + 1 == n;
                let high = if last {
                    self.high
                } else {
                    self.low + step * (i + 1) as f64
                };
                Interval {
                    low,
                    high,
                    lower_closed: if i == 0 { self.lower_closed } else { true },
                    upper_closed: if last { self.upper_closed } else { false },
                }
            })
            .collect()
    }

    /// Smallest interval containing both.
    pub fn hull(&self, other: &Self) -> Self {
        let (low, lower_closed) = if self.low < other.low {
            (self.low, self.lower_closed)
        } else if other.low < self.low {
            (other.low, other.lower_closed)
        } else {
            (self.low, self.lower_closed || other.lower_closed)
        };
        let (high, upper_closed) = if self.high > other.high {
            (self.high, self.upper_closed)
        } else if other.high > self.high {
            (other.high, other.upper_closed)
        } else {
            (self.high, self.upper_closed || other.upper_closed)
        };
        Interval {
            low,
            high,
            lower_closed,
            upper_closed,
        }
    }

    /// Widen (closed on the widened side) until `x` is included.
    pub fn expand_to(&self, x: f64) -> Self {
        let mut out = *self;
        if x < out.low || (x == out.low && !out.lower_closed) {
            out.low = x;
            out.lower_closed = true;
        }
        if x > out.high || (x == out.high && !out.upper_closed) {
            out.high = x;
            out.upper_closed = true;
        }
        out
    }

    /// Common part of both intervals, `None` when they do not meet.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let hull_low = if self.low > other.low { self } else { other };
        let hull_high = if self.high < other.high { self } else { other };
        let low = self.low.max(other.low);
        let high = self.high.min(other.high);
        let lower_closed = if self.low == other.low {
            self.lower_closed && other.lower_closed
        } else {
            hull_low.lower_closed
        };
        let upper_closed = if self.high == other.high {
            self.upper_closed && other.upper_closed
        } else {
            hull_high.upper_closed
        };
        if low > high || (low == high && !(lower_closed && upper_closed)) {
            return None;
        }
        Some(Interval {
            low,
            high,
            lower_closed,
            upper_closed,
        })
    }

    /// True when the interiors overlap, i.e. the intervals share more than an endpoint.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.low < other.high && other.low < self.high
    }

    /// True when `self` ends exactly where `other` starts.
    pub fn touches_below(&self, other: &Self) -> bool {
        self.high == other.low
    }

    pub fn same_bounds(&self, other: &Self) -> bool {
        self.low == other.low && self.high == other.high
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lb = if self.lower_closed { '[' } else { '(' };
        let ub = if self.upper_closed { ']' } else { ')' };
        write!(f, "{}{:.4}, {:.4}{}", lb, self.low, self.high, ub)
    }
}
