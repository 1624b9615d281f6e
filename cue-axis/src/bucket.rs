use std::collections::{HashMap, HashSet};

use log::debug;

use cue_types::{Cue, Endpoint, Interval, Relation, RelationMask, Semantic, SharedCue};

use crate::error::{AxisError, Result};
use crate::index::EndpointIndex;

/// Hash key for a timeline point. Normalizes -0.0 so both zeros land in the
/// same slot; NaN never reaches the axis because `Interval` rejects it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PointKey(u64);

impl PointKey {
    fn new(value: f64) -> Self {
        let normalized = if value == 0.0 { 0.0 } else { value };
        Self(normalized.to_bits())
    }

    fn value(self) -> f64 {
        f64::from_bits(self.0)
    }
}

/// Length-capped cue partition: a map from point to the cues referencing that
/// point as an endpoint, plus a sorted index of those points.
///
/// `add`/`remove` are buffered into the `created`/`dirty` staging sets;
/// `flush` reconciles staging into the point map and issues a single
/// [`EndpointIndex::update`].
pub struct CueBucket {
    max_length: f64,
    point_map: HashMap<PointKey, Vec<SharedCue>>,
    point_index: EndpointIndex,
    /// Points absent from the index before the running batch.
    created: HashSet<PointKey>,
    /// Points possibly emptied during the running batch.
    dirty: HashSet<PointKey>,
}

impl CueBucket {
    pub fn new(max_length: f64) -> Self {
        Self {
            max_length,
            point_map: HashMap::new(),
            point_index: EndpointIndex::new(),
            created: HashSet::new(),
            dirty: HashSet::new(),
        }
    }

    pub fn max_length(&self) -> f64 {
        self.max_length
    }

    pub fn is_empty(&self) -> bool {
        self.point_map.is_empty()
    }

    /// Stage a cue at one of its endpoint points. Adding a key already
    /// present at the point is a no-op.
    pub fn add(&mut self, point: f64, cue: &SharedCue) {
        let key = PointKey::new(point);
        match self.point_map.get_mut(&key) {
            Some(cues) => {
                let cue_key = cue.read().key.clone();
                if !cues.iter().any(|c| c.read().key == cue_key) {
                    cues.push(SharedCue::clone(cue));
                }
            }
            None => {
                self.point_map.insert(key, vec![SharedCue::clone(cue)]);
                if !self.point_index.has(point) {
                    self.created.insert(key);
                }
            }
        }
    }

    /// Stage removal of a cue from one of its endpoint points. Removing a
    /// missing key is a no-op. Returns true when the point's list emptied.
    pub fn remove(&mut self, point: f64, cue: &Cue) -> bool {
        let key = PointKey::new(point);
        let Some(cues) = self.point_map.get_mut(&key) else {
            return false;
        };
        cues.retain(|c| c.read().key != cue.key);
        if cues.is_empty() {
            if !self.created.contains(&key) {
                self.dirty.insert(key);
            }
            true
        } else {
            false
        }
    }

    /// Reconcile staging into the point map, dropping emptied entries, and
    /// apply the resulting point set change to the index in one batch.
    pub fn flush(&mut self) {
        if self.created.is_empty() && self.dirty.is_empty() {
            return;
        }
        let mut to_insert = Vec::with_capacity(self.created.len());
        let mut to_remove = Vec::with_capacity(self.dirty.len());
        for key in self.created.drain() {
            let occupied = self.point_map.get(&key).is_some_and(|cues| !cues.is_empty());
            if occupied {
                to_insert.push(key.value());
            } else {
                self.point_map.remove(&key);
            }
        }
        for key in self.dirty.drain() {
            let occupied = self.point_map.get(&key).is_some_and(|cues| !cues.is_empty());
            if !occupied {
                self.point_map.remove(&key);
                to_remove.push(key.value());
            }
        }
        if !to_insert.is_empty() || !to_remove.is_empty() {
            debug!(
                "bucket cap {}: flush +{} -{} point(s)",
                self.max_length,
                to_insert.len(),
                to_remove.len()
            );
            self.point_index.update(&to_remove, &to_insert);
        }
    }

    /// All cues in this bucket whose relation to `interval` is in `mode`.
    pub fn lookup(&self, interval: &Interval, mode: RelationMask) -> Vec<SharedCue> {
        let mut out = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        if mode == RelationMask::EQUALS {
            // fast path: equal cues anchor at the query's low point
            if let Some(cues) = self.point_map.get(&PointKey::new(interval.low())) {
                for cue in cues {
                    let guard = cue.read();
                    if guard.interval.as_ref() == Some(interval) && seen.insert(guard.key.clone()) {
                        drop(guard);
                        out.push(SharedCue::clone(cue));
                    }
                }
            }
            return out;
        }

        if mode.intersects(RelationMask::NON_COVERS) {
            self.scan(
                &span(interval.low(), interval.high()),
                |cue_interval| mode.contains(cue_interval.compare(interval)),
                &mut seen,
                &mut out,
            );
        }

        if mode.contains(Relation::Covers) && interval.length() <= self.max_length {
            // only cues at least as long as the query can cover it, and every
            // cue here is capped, so the candidate low endpoints lie in
            // [high - cap, low]
            let mut scan_low = interval.high() - self.max_length;
            if scan_low.is_nan() {
                scan_low = f64::NEG_INFINITY;
            }
            let keep = |cue_interval: &Interval| cue_interval.compare(interval) == Relation::Covers;
            if scan_low == interval.low() && scan_low.is_infinite() {
                // an unbounded query low pins the candidate range to the
                // single point at -infinity, which no span can express
                self.scan_point(scan_low, &keep, &mut seen, &mut out);
            } else {
                self.scan(&span(scan_low, interval.low()), &keep, &mut seen, &mut out);
            }
        }

        out
    }

    fn scan(
        &self,
        range: &Interval,
        keep: impl Fn(&Interval) -> bool,
        seen: &mut HashSet<String>,
        out: &mut Vec<SharedCue>,
    ) {
        for &point in self.point_index.lookup(range) {
            self.scan_point(point, &keep, seen, out);
        }
    }

    fn scan_point(
        &self,
        point: f64,
        keep: impl Fn(&Interval) -> bool,
        seen: &mut HashSet<String>,
        out: &mut Vec<SharedCue>,
    ) {
        let Some(cues) = self.point_map.get(&PointKey::new(point)) else {
            return;
        };
        for cue in cues {
            let guard = cue.read();
            let Some(cue_interval) = guard.interval else {
                continue;
            };
            if seen.contains(&guard.key) || !keep(&cue_interval) {
                continue;
            }
            seen.insert(guard.key.clone());
            drop(guard);
            out.push(SharedCue::clone(cue));
        }
    }

    /// `(endpoint, cue)` pairs for every cue endpoint falling inside
    /// `interval` by endpoint order. A singular cue contributes one pair.
    pub fn lookup_points(&self, interval: &Interval) -> Vec<(Endpoint, SharedCue)> {
        let mut out = Vec::new();
        for &point in self.point_index.lookup(&span(interval.low(), interval.high())) {
            let Some(cues) = self.point_map.get(&PointKey::new(point)) else {
                continue;
            };
            for cue in cues {
                let guard = cue.read();
                let Some(cue_interval) = guard.interval else {
                    continue;
                };
                drop(guard);
                let (low, high) = cue_interval.endpoints();
                for endpoint in [Some(low), high].into_iter().flatten() {
                    if endpoint.value == point && interval.inside(&endpoint) {
                        out.push((endpoint, SharedCue::clone(cue)));
                    }
                }
            }
        }
        out
    }

    /// Look up with the given semantic and remove every returned cue,
    /// batching point deletions through [`EndpointIndex::remove_in_slice`].
    pub fn lookup_remove(&mut self, interval: &Interval, semantic: Semantic) -> Vec<SharedCue> {
        let cues = self.lookup(interval, semantic.mask());
        if cues.is_empty() {
            return cues;
        }
        let mut emptied: Vec<f64> = Vec::new();
        for cue in &cues {
            let snapshot = cue.read().clone();
            let Some(cue_interval) = snapshot.interval else {
                continue;
            };
            let mut points = vec![cue_interval.low()];
            if !cue_interval.is_singular() {
                points.push(cue_interval.high());
            }
            for point in points {
                let key = PointKey::new(point);
                if let Some(list) = self.point_map.get_mut(&key) {
                    list.retain(|c| c.read().key != snapshot.key);
                    if list.is_empty() {
                        self.point_map.remove(&key);
                        emptied.push(point);
                    }
                }
            }
        }
        emptied.sort_unstable_by(f64::total_cmp);
        self.point_index.remove_in_slice(&emptied);
        cues
    }

    pub fn clear(&mut self) {
        self.point_map.clear();
        self.point_index.clear();
        self.created.clear();
        self.dirty.clear();
    }

    /// Diagnostic invariant check; call after flush.
    pub fn integrity(&self) -> Result<BucketIntegrity> {
        if !self.created.is_empty() || !self.dirty.is_empty() {
            return Err(AxisError::invariant("bucket has unflushed staging"));
        }
        if self.point_index.len() != self.point_map.len() {
            return Err(AxisError::invariant(format!(
                "index holds {} point(s), map holds {}",
                self.point_index.len(),
                self.point_map.len()
            )));
        }
        let mut keys = HashSet::new();
        for &point in self.point_index.values() {
            let Some(cues) = self.point_map.get(&PointKey::new(point)) else {
                return Err(AxisError::invariant(format!(
                    "index point {point} missing from point map"
                )));
            };
            if cues.is_empty() {
                return Err(AxisError::invariant(format!(
                    "index point {point} maps to an empty cue list"
                )));
            }
            for cue in cues {
                let guard = cue.read();
                let Some(cue_interval) = guard.interval else {
                    return Err(AxisError::invariant(format!(
                        "cue {} sits in a bucket without an interval",
                        guard.key
                    )));
                };
                if cue_interval.low() != point && cue_interval.high() != point {
                    return Err(AxisError::invariant(format!(
                        "cue {} listed at {point} which is not one of its endpoints",
                        guard.key
                    )));
                }
                if !(cue_interval.length() <= self.max_length) {
                    return Err(AxisError::invariant(format!(
                        "cue {} length {} exceeds bucket cap {}",
                        guard.key,
                        cue_interval.length(),
                        self.max_length
                    )));
                }
                keys.insert(guard.key.clone());
            }
        }
        Ok(BucketIntegrity {
            max_length: self.max_length,
            points: self.point_index.len(),
            keys,
        })
    }
}

/// Diagnostic snapshot returned by [`CueBucket::integrity`].
#[derive(Debug)]
pub struct BucketIntegrity {
    pub max_length: f64,
    pub points: usize,
    pub keys: HashSet<String>,
}

fn span(low: f64, high: f64) -> Interval {
    Interval::closed(low, high).expect("scan span bounds are ordered")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cue(key: &str, low: f64, high: f64) -> SharedCue {
        Cue::new(key, Interval::closed(low, high).unwrap(), json!({})).into_shared()
    }

    fn insert(bucket: &mut CueBucket, cue: &SharedCue) {
        let interval = cue.read().interval.unwrap();
        bucket.add(interval.low(), cue);
        if !interval.is_singular() {
            bucket.add(interval.high(), cue);
        }
    }

    #[test]
    fn add_flush_lookup() {
        let mut bucket = CueBucket::new(10.0);
        let a = cue("a", 3.0, 4.0);
        insert(&mut bucket, &a);
        bucket.flush();

        let report = bucket.integrity().unwrap();
        assert_eq!(report.points, 2);
        assert!(report.keys.contains("a"));

        let hit = bucket.lookup(&Interval::closed(3.5, 3.6).unwrap(), RelationMask::OVERLAP);
        assert_eq!(hit.len(), 1);
        let miss = bucket.lookup(&Interval::closed(5.0, 6.0).unwrap(), RelationMask::OVERLAP);
        assert!(miss.is_empty());
    }

    #[test]
    fn duplicate_add_and_missing_remove_are_noops() {
        let mut bucket = CueBucket::new(10.0);
        let a = cue("a", 1.0, 2.0);
        insert(&mut bucket, &a);
        insert(&mut bucket, &a);
        bucket.flush();
        let report = bucket.integrity().unwrap();
        assert_eq!(report.points, 2);
        assert_eq!(report.keys.len(), 1);

        let ghost = Cue::tombstone("ghost");
        assert!(!bucket.remove(1.0, &ghost));
        assert!(!bucket.remove(99.0, &ghost));
    }

    #[test]
    fn remove_reports_emptied_point() {
        let mut bucket = CueBucket::new(10.0);
        let a = cue("a", 1.0, 2.0);
        let b = cue("b", 1.0, 3.0);
        insert(&mut bucket, &a);
        insert(&mut bucket, &b);
        bucket.flush();

        let snapshot = a.read().clone();
        assert!(!bucket.remove(1.0, &snapshot));
        assert!(bucket.remove(2.0, &snapshot));
        bucket.flush();

        let report = bucket.integrity().unwrap();
        assert_eq!(report.points, 2); // 1.0 still held by b, 3.0 by b
        assert_eq!(report.keys.len(), 1);
    }

    #[test]
    fn equals_fast_path() {
        let mut bucket = CueBucket::new(10.0);
        let a = cue("a", 1.0, 2.0);
        let b = cue("b", 1.0, 3.0);
        insert(&mut bucket, &a);
        insert(&mut bucket, &b);
        bucket.flush();

        let hit = bucket.lookup(&Interval::closed(1.0, 2.0).unwrap(), RelationMask::EQUALS);
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].read().key, "a");
    }

    #[test]
    fn covers_scan_skips_oversized_queries() {
        let mut bucket = CueBucket::new(10.0);
        let a = cue("a", 0.0, 8.0);
        insert(&mut bucket, &a);
        bucket.flush();

        let covers: RelationMask = Relation::Covers.into();
        let hit = bucket.lookup(&Interval::closed(3.0, 4.0).unwrap(), covers);
        assert_eq!(hit.len(), 1);

        // a 20-long query cannot be covered by anything capped at 10
        let miss = bucket.lookup(&Interval::closed(-5.0, 15.0).unwrap(), covers);
        assert!(miss.is_empty());
    }

    #[test]
    fn unbounded_query_low_reaches_terminal_bucket() {
        let query = Interval::new(f64::NEG_INFINITY, 5.0, true, true).unwrap();

        // the covers scan must survive the degenerate [-inf, -inf] range
        let mut empty = CueBucket::new(f64::INFINITY);
        assert!(empty.lookup(&query, Semantic::Overlap.mask()).is_empty());

        let mut bucket = CueBucket::new(f64::INFINITY);
        let tail = Cue::new(
            "tail",
            Interval::new(f64::NEG_INFINITY, 10.0, true, true).unwrap(),
            json!({}),
        )
        .into_shared();
        insert(&mut bucket, &tail);
        bucket.flush();

        let hit = bucket.lookup(&query, Semantic::Overlap.mask());
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].read().key, "tail");

        let covers: RelationMask = Relation::Covers.into();
        let hit = bucket.lookup(&query, covers);
        assert_eq!(hit.len(), 1);
    }

    #[test]
    fn lookup_points_reports_inside_endpoints_once() {
        let mut bucket = CueBucket::new(10.0);
        let a = cue("a", 1.0, 4.0);
        let point = Cue::new("p", Interval::singular(2.0).unwrap(), json!({})).into_shared();
        insert(&mut bucket, &a);
        insert(&mut bucket, &point);
        bucket.flush();

        let pairs = bucket.lookup_points(&Interval::closed(0.0, 3.0).unwrap());
        let mut keys: Vec<_> = pairs
            .iter()
            .map(|(endpoint, cue)| (cue.read().key.clone(), endpoint.value))
            .collect();
        keys.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(keys, vec![("a".to_string(), 1.0), ("p".to_string(), 2.0)]);
    }

    #[test]
    fn lookup_remove_drains_matches() {
        let mut bucket = CueBucket::new(10.0);
        let a = cue("a", 1.0, 2.0);
        let b = cue("b", 5.0, 6.0);
        insert(&mut bucket, &a);
        insert(&mut bucket, &b);
        bucket.flush();

        let removed = bucket.lookup_remove(&Interval::closed(0.0, 3.0).unwrap(), Semantic::Inside);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].read().key, "a");

        let report = bucket.integrity().unwrap();
        assert_eq!(report.points, 2);
        assert!(!report.keys.contains("a"));
    }

    #[test]
    fn clear_resets_state() {
        let mut bucket = CueBucket::new(10.0);
        insert(&mut bucket, &cue("a", 1.0, 2.0));
        bucket.flush();
        bucket.clear();
        assert!(bucket.is_empty());
        assert_eq!(bucket.integrity().unwrap().points, 0);
    }
}
