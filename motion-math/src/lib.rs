// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Closed-form kinematics for a uniformly accelerated point on the timeline:
//! vector extrapolation, the position window swept during a time window,
//! crossing times of a fixed position, endpoint-event generation, and range
//! intersection.

use serde::{Deserialize, Serialize};

use cue_types::{Endpoint, Interval, SharedCue};

/// Snapshot of the moving point: position, velocity and acceleration at
/// `timestamp` (seconds).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionVector {
    pub position: f64,
    pub velocity: f64,
    pub acceleration: f64,
    pub timestamp: f64,
}

impl MotionVector {
    pub fn new(position: f64, velocity: f64, acceleration: f64, timestamp: f64) -> Self {
        Self {
            position,
            velocity,
            acceleration,
            timestamp,
        }
    }

    pub fn is_moving(&self) -> bool {
        self.velocity != 0.0 || self.acceleration != 0.0
    }

    pub fn position_at(&self, t: f64) -> f64 {
        let d = t - self.timestamp;
        self.position + self.velocity * d + 0.5 * self.acceleration * d * d
    }

    pub fn velocity_at(&self, t: f64) -> f64 {
        self.velocity + self.acceleration * (t - self.timestamp)
    }

    /// Extrapolated snapshot at `t`.
    pub fn at(&self, t: f64) -> MotionVector {
        MotionVector {
            position: self.position_at(t),
            velocity: self.velocity_at(t),
            acceleration: self.acceleration,
            timestamp: t,
        }
    }

    /// Time at which the velocity reaches zero, if acceleration is non-zero.
    fn turning_time(&self) -> Option<f64> {
        if self.acceleration == 0.0 {
            None
        } else {
            Some(self.timestamp - self.velocity / self.acceleration)
        }
    }
}

/// Sign of the velocity at a crossing. `Still` marks the tangent case: the
/// point touches the position with instantaneous velocity zero and does not
/// change active state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Backward,
    Still,
    Forward,
}

impl Direction {
    fn from_velocity(velocity: f64) -> Self {
        if velocity > 0.0 {
            Direction::Forward
        } else if velocity < 0.0 {
            Direction::Backward
        } else {
            Direction::Still
        }
    }
}

/// A scheduled crossing of a cue endpoint by the moving point.
#[derive(Clone, Debug)]
pub struct EndpointEvent {
    pub ts: f64,
    pub endpoint: Endpoint,
    pub cue: SharedCue,
    pub direction: Direction,
}

/// Closed interval of positions the motion occupies during `time_interval`,
/// including the turning point when the velocity changes sign inside the
/// window.
pub fn position_interval(time_interval: &Interval, v: &MotionVector) -> Interval {
    let p_start = v.position_at(time_interval.low());
    let p_end = v.position_at(time_interval.high());
    let (mut low, mut high) = if p_start <= p_end {
        (p_start, p_end)
    } else {
        (p_end, p_start)
    };
    if let Some(t_turn) = v.turning_time() {
        if time_interval.low() < t_turn && t_turn < time_interval.high() {
            let p_turn = v.position_at(t_turn);
            low = low.min(p_turn);
            high = high.max(p_turn);
        }
    }
    Interval::closed(low, high).expect("swept positions are ordered and finite")
}

/// Times at which the motion occupies position `x`, ascending. Empty when the
/// motion never reaches `x`; a static motion crosses nothing, even in place.
pub fn crossing_times(v: &MotionVector, x: f64) -> Vec<f64> {
    if v.acceleration == 0.0 {
        if v.velocity == 0.0 {
            return Vec::new();
        }
        return vec![v.timestamp + (x - v.position) / v.velocity];
    }
    let disc = v.velocity * v.velocity - 2.0 * v.acceleration * (v.position - x);
    if disc < 0.0 {
        return Vec::new();
    }
    if disc == 0.0 {
        return vec![v.timestamp - v.velocity / v.acceleration];
    }
    let sq = disc.sqrt();
    let d1 = (-v.velocity - sq) / v.acceleration;
    let d2 = (-v.velocity + sq) / v.acceleration;
    vec![v.timestamp + d1.min(d2), v.timestamp + d1.max(d2)]
}

/// For each endpoint, the earliest crossing whose timestamp lies inside
/// `time_interval`, tagged with the crossing direction.
pub fn endpoint_events(
    time_interval: &Interval,
    v: &MotionVector,
    points: &[(Endpoint, SharedCue)],
) -> Vec<EndpointEvent> {
    let mut events = Vec::new();
    for (endpoint, cue) in points {
        for ts in crossing_times(v, endpoint.value) {
            if !time_interval.covers(ts) {
                continue;
            }
            events.push(EndpointEvent {
                ts,
                endpoint: *endpoint,
                cue: cue.clone(),
                direction: Direction::from_velocity(v.velocity_at(ts)),
            });
            break;
        }
    }
    events
}

/// First times at or after `v.timestamp` that the motion enters and leaves
/// `range`. A motion already inside enters at `v.timestamp`; a bound the
/// motion never reaches yields infinity.
pub fn range_intersect(v: &MotionVector, range: (f64, f64)) -> (f64, f64) {
    let (low, high) = range;
    let inside_now = low <= v.position && v.position <= high;
    let mut enter = if inside_now { v.timestamp } else { f64::INFINITY };
    let mut leave = f64::INFINITY;

    let mut crossings: Vec<(f64, bool)> = Vec::new();
    for bound in [low, high] {
        if !bound.is_finite() {
            continue;
        }
        for ts in crossing_times(v, bound) {
            if ts < v.timestamp {
                continue;
            }
            let vel = v.velocity_at(ts);
            let outward = if bound == high {
                vel > 0.0 || (vel == 0.0 && v.acceleration > 0.0)
            } else {
                vel < 0.0 || (vel == 0.0 && v.acceleration < 0.0)
            };
            crossings.push((ts, outward));
        }
    }
    crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

    for (ts, outward) in crossings {
        if !outward {
            if enter.is_infinite() {
                enter = ts;
            }
        } else if enter.is_finite() && leave.is_infinite() && ts >= enter {
            leave = ts;
        }
    }
    (enter, leave)
}
