// Copyright (c) James Kassemi, SC, US. All rights reserved.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::endpoint::Endpoint;
use crate::relation::Relation;

#[derive(Debug, Error, PartialEq)]
pub enum IntervalError {
    #[error("interval bounds must not be NaN")]
    NanBound,
    #[error("interval low {low} exceeds high {high}")]
    LowAboveHigh { low: f64, high: f64 },
    #[error("singular interval at {at} must be closed on both sides")]
    OpenSingular { at: f64 },
    #[error("singular interval must be finite, got {at}")]
    InfiniteSingular { at: f64 },
}

/// Interval on the timeline, with per-side closedness. `low <= high` holds by
/// construction and the bounds are never NaN.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Interval {
    low: f64,
    high: f64,
    low_closed: bool,
    high_closed: bool,
}

impl Interval {
    pub fn new(low: f64, high: f64, low_closed: bool, high_closed: bool) -> Result<Self, IntervalError> {
        if low.is_nan() || high.is_nan() {
            return Err(IntervalError::NanBound);
        }
        if low > high {
            return Err(IntervalError::LowAboveHigh { low, high });
        }
        if low == high {
            if !low_closed || !high_closed {
                return Err(IntervalError::OpenSingular { at: low });
            }
            if low.is_infinite() {
                return Err(IntervalError::InfiniteSingular { at: low });
            }
        }
        // fold -0.0 into +0.0 so total_cmp-ordered indexes see one zero
        Ok(Self {
            low: if low == 0.0 { 0.0 } else { low },
            high: if high == 0.0 { 0.0 } else { high },
            low_closed,
            high_closed,
        })
    }

    pub fn closed(low: f64, high: f64) -> Result<Self, IntervalError> {
        Self::new(low, high, true, true)
    }

    pub fn open(low: f64, high: f64) -> Result<Self, IntervalError> {
        Self::new(low, high, false, false)
    }

    pub fn singular(at: f64) -> Result<Self, IntervalError> {
        Self::new(at, at, true, true)
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low_closed(&self) -> bool {
        self.low_closed
    }

    pub fn high_closed(&self) -> bool {
        self.high_closed
    }

    pub fn length(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_singular(&self) -> bool {
        self.low == self.high
    }

    pub fn endpoint_low(&self) -> Endpoint {
        Endpoint::low(self.low, self.low_closed)
    }

    pub fn endpoint_high(&self) -> Endpoint {
        Endpoint::high(self.high, self.high_closed)
    }

    /// Low endpoint plus the high endpoint for non-singular intervals. A
    /// singular interval contributes a single point.
    pub fn endpoints(&self) -> (Endpoint, Option<Endpoint>) {
        if self.is_singular() {
            (self.endpoint_low(), None)
        } else {
            (self.endpoint_low(), Some(self.endpoint_high()))
        }
    }

    /// Whether a plain value falls inside the interval.
    pub fn covers(&self, value: f64) -> bool {
        if value.is_nan() {
            return false;
        }
        self.inside(&Endpoint::low(value, true))
    }

    /// Whether an endpoint falls inside the interval by endpoint order.
    pub fn inside(&self, endpoint: &Endpoint) -> bool {
        self.endpoint_low().cmp_order(endpoint) != Ordering::Greater
            && endpoint.cmp_order(&self.endpoint_high()) != Ordering::Greater
    }

    /// Classify this interval against a query interval. Total: every pair of
    /// intervals lands in exactly one relation, and two intervals compare
    /// [`Relation::Equals`] iff value and closedness match on both sides.
    pub fn compare(&self, query: &Interval) -> Relation {
        let a_low = self.endpoint_low();
        let a_high = self.endpoint_high();
        let b_low = query.endpoint_low();
        let b_high = query.endpoint_high();

        if a_high.cmp_order(&b_low) == Ordering::Less {
            return Relation::OutsideLeft;
        }
        if a_low.cmp_order(&b_high) == Ordering::Greater {
            return Relation::OutsideRight;
        }
        let low_cmp = a_low.cmp_order(&b_low);
        let high_cmp = a_high.cmp_order(&b_high);
        if low_cmp == Ordering::Equal && high_cmp == Ordering::Equal {
            Relation::Equals
        } else if low_cmp != Ordering::Greater && high_cmp != Ordering::Less {
            Relation::Covers
        } else if low_cmp != Ordering::Less && high_cmp != Ordering::Greater {
            Relation::Covered
        } else if low_cmp == Ordering::Less {
            Relation::OverlapLeft
        } else {
            Relation::OverlapRight
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let open = if self.low_closed { '[' } else { '(' };
        let close = if self.high_closed { ']' } else { ')' };
        write!(f, "{}{}, {}{}", open, self.low, self.high, close)
    }
}
