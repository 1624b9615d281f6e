use std::cmp::Ordering;

use cue_types::Interval;

/// Sorted set of timeline points backing one bucket.
///
/// Lookup is `O(log n + k)`; `update` re-merges the whole vector in one pass
/// after sorting its two argument lists; `remove_in_slice` touches only the
/// span the sorted argument run covers. Duplicates within one `update` call
/// are the caller's contract violation.
#[derive(Debug, Default)]
pub struct EndpointIndex {
    points: Vec<f64>,
}

impl EndpointIndex {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.points
    }

    pub fn has(&self, point: f64) -> bool {
        self.points
            .binary_search_by(|p| p.total_cmp(&point))
            .is_ok()
    }

    /// First index whose point is above `value`, or at it when `strict`.
    fn boundary(&self, value: f64, strict: bool) -> usize {
        self.points.partition_point(|p| match p.total_cmp(&value) {
            Ordering::Less => true,
            Ordering::Equal => strict,
            Ordering::Greater => false,
        })
    }

    /// Points inside `interval`, honouring closedness.
    pub fn lookup(&self, interval: &Interval) -> &[f64] {
        let start = self.boundary(interval.low(), !interval.low_closed());
        let end = self.boundary(interval.high(), interval.high_closed());
        &self.points[start..end]
    }

    /// One atomic bulk update; both argument lists may arrive unsorted.
    pub fn update(&mut self, to_remove: &[f64], to_insert: &[f64]) {
        if to_remove.is_empty() && to_insert.is_empty() {
            return;
        }
        let mut remove = to_remove.to_vec();
        remove.sort_unstable_by(f64::total_cmp);
        let mut insert = to_insert.to_vec();
        insert.sort_unstable_by(f64::total_cmp);

        let old = std::mem::take(&mut self.points);
        let mut merged = Vec::with_capacity(old.len() + insert.len());
        let mut r = 0;
        let mut i = 0;
        for p in old {
            while r < remove.len() && remove[r].total_cmp(&p) == Ordering::Less {
                r += 1;
            }
            if r < remove.len() && remove[r].total_cmp(&p) == Ordering::Equal {
                r += 1;
                continue;
            }
            while i < insert.len() && insert[i].total_cmp(&p) == Ordering::Less {
                merged.push(insert[i]);
                i += 1;
            }
            merged.push(p);
        }
        merged.extend_from_slice(&insert[i..]);
        self.points = merged;
    }

    /// Localized removal of a sorted run of points; absent points are ignored.
    pub fn remove_in_slice(&mut self, sorted_points: &[f64]) {
        let Some((&first, &last)) = sorted_points.first().zip(sorted_points.last()) else {
            return;
        };
        let start = self.boundary(first, false);
        let end = self.boundary(last, true);
        let mut write = start;
        let mut s = 0;
        for read in start..end {
            let p = self.points[read];
            while s < sorted_points.len() && sorted_points[s].total_cmp(&p) == Ordering::Less {
                s += 1;
            }
            if s < sorted_points.len() && sorted_points[s].total_cmp(&p) == Ordering::Equal {
                continue;
            }
            self.points[write] = p;
            write += 1;
        }
        let len = self.points.len();
        self.points.copy_within(end..len, write);
        self.points.truncate(write + (len - end));
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}
