use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::debug;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use cue_types::{
    ChangeBatch, Cue, CueChange, CueDelta, DeltaKind, Endpoint, Interval, RelationMask, Semantic,
    SharedCue,
};
use eventify::{CallbackHandle, CallbackRegistry};

use crate::bucket::{BucketIntegrity, CueBucket};
use crate::error::{AxisError, Result};

/// Ascending bucket caps. Every cue with an interval lands in the smallest
/// cap that can hold its length.
const BUCKET_CAPS: [f64; 6] = [10.0, 100.0, 1e3, 1e4, 1e5, f64::INFINITY];

/// User-provided data comparator.
pub type DataEquals = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct UpdateOptions {
    /// Validate the whole batch before the first mutation.
    pub check: bool,
    /// Override equality on cue data; value equality by default.
    pub equals: Option<DataEquals>,
}

struct AxisState {
    cue_map: HashMap<String, SharedCue>,
    buckets: Vec<CueBucket>,
}

impl AxisState {
    fn bucket_for(&mut self, length: f64) -> &mut CueBucket {
        self.buckets
            .iter_mut()
            .find(|bucket| length <= bucket.max_length())
            .expect("terminal bucket cap is infinite")
    }

    fn process_cue(&mut self, arg: Cue, options: &UpdateOptions) -> CueChange {
        let Cue {
            key,
            interval,
            data,
        } = arg;
        let current = self.cue_map.get(&key).map(SharedCue::clone);
        let old: Option<Cue> = current.as_ref().map(|shared| shared.read().clone());

        let deleting = interval.is_none() && data.is_none();
        let new: Option<Cue> = if deleting {
            None
        } else {
            // partial update: an omitted component keeps its current value
            Some(Cue {
                key: key.clone(),
                interval: interval.or_else(|| old.as_ref().and_then(|c| c.interval)),
                data: data.or_else(|| old.as_ref().and_then(|c| c.data.clone())),
            })
        };

        let delta = cue_delta(new.as_ref(), old.as_ref(), options);
        if delta.is_noop() {
            return CueChange {
                key,
                new: old.clone(),
                old,
                delta,
            };
        }

        let old_interval = old.as_ref().and_then(|c| c.interval);
        let new_interval = new.as_ref().and_then(|c| c.interval);
        let remove_needed = old_interval.is_some()
            && matches!(delta.interval, DeltaKind::Replace | DeltaKind::Delete);
        let add_needed = new_interval.is_some()
            && matches!(delta.interval, DeltaKind::Insert | DeltaKind::Replace);

        if remove_needed {
            if let (Some(itv), Some(old_cue)) = (old_interval, old.as_ref()) {
                let bucket = self.bucket_for(itv.length());
                bucket.remove(itv.low(), old_cue);
                if !itv.is_singular() {
                    bucket.remove(itv.high(), old_cue);
                }
            }
        }

        let handle = match (current, new.as_ref()) {
            (Some(shared), Some(new_cue)) => {
                // in-place replace keeps bucket and consumer references live
                *shared.write() = new_cue.clone();
                Some(shared)
            }
            (Some(_), None) => {
                self.cue_map.remove(&key);
                None
            }
            (None, Some(new_cue)) => {
                let shared = new_cue.clone().into_shared();
                self.cue_map.insert(key.clone(), SharedCue::clone(&shared));
                Some(shared)
            }
            (None, None) => None,
        };

        if add_needed {
            if let (Some(itv), Some(shared)) = (new_interval, handle.as_ref()) {
                let bucket = self.bucket_for(itv.length());
                bucket.add(itv.low(), shared);
                if !itv.is_singular() {
                    bucket.add(itv.high(), shared);
                }
            }
        }

        CueChange {
            key,
            new,
            old,
            delta,
        }
    }
}

fn cue_delta(new: Option<&Cue>, old: Option<&Cue>, options: &UpdateOptions) -> CueDelta {
    let interval = match (
        old.and_then(|c| c.interval.as_ref()),
        new.and_then(|c| c.interval.as_ref()),
    ) {
        (None, None) => DeltaKind::Noop,
        (None, Some(_)) => DeltaKind::Insert,
        (Some(_), None) => DeltaKind::Delete,
        (Some(a), Some(b)) => {
            if a == b {
                DeltaKind::Noop
            } else {
                DeltaKind::Replace
            }
        }
    };
    let data = match (
        old.and_then(|c| c.data.as_ref()),
        new.and_then(|c| c.data.as_ref()),
    ) {
        (None, None) => DeltaKind::Noop,
        (None, Some(_)) => DeltaKind::Insert,
        (Some(_), None) => DeltaKind::Delete,
        (Some(a), Some(b)) => {
            let equal = match &options.equals {
                Some(eq) => eq(a, b),
                None => a == b,
            };
            if equal {
                DeltaKind::Noop
            } else {
                DeltaKind::Replace
            }
        }
    };
    CueDelta { interval, data }
}

/// Authoritative cue store: key → cue map plus length-capped buckets, with
/// batched transactional updates and `change` notifications.
///
/// All methods take `&self`; writes serialize on an internal lock. Observers
/// get consistent snapshots in `change` and must not mutate the axis from
/// inside a handler (reentrant mutation is undefined).
pub struct Axis {
    state: RwLock<AxisState>,
    callbacks: Mutex<CallbackRegistry<ChangeBatch>>,
}

impl Axis {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(AxisState {
                cue_map: HashMap::new(),
                buckets: BUCKET_CAPS.iter().map(|&cap| CueBucket::new(cap)).collect(),
            }),
            callbacks: Mutex::new(CallbackRegistry::new()),
        }
    }

    /// Apply a batch of cue arguments in order and emit one `change` event.
    ///
    /// A cue with only one of `interval`/`data` present keeps the stored
    /// value for the omitted component; a cue with both absent deletes. The
    /// returned batch maps key → change record; a key repeated in the input
    /// keeps the `old` of its first record so the batch replays cleanly
    /// against a mirror.
    pub fn update(
        &self,
        cues: impl IntoIterator<Item = Cue>,
        options: &UpdateOptions,
    ) -> Result<ChangeBatch> {
        let args: Vec<Cue> = cues.into_iter().collect();
        if options.check {
            for arg in &args {
                if arg.key.is_empty() {
                    return Err(AxisError::InvalidArgument {
                        reason: "cue key must not be empty".to_string(),
                    });
                }
            }
        }
        let batch = {
            let mut state = self.state.write();
            let mut batch: ChangeBatch = HashMap::with_capacity(args.len());
            for arg in args {
                let change = state.process_cue(arg, options);
                match batch.entry(change.key.clone()) {
                    Entry::Vacant(slot) => {
                        slot.insert(change);
                    }
                    Entry::Occupied(mut slot) => {
                        let record = slot.get_mut();
                        record.new = change.new;
                        record.delta =
                            cue_delta(record.new.as_ref(), record.old.as_ref(), options);
                    }
                }
            }
            for bucket in &mut state.buckets {
                bucket.flush();
            }
            batch
        };
        debug!("axis update: {} record(s)", batch.len());
        self.notify(&batch);
        Ok(batch)
    }

    /// Cues whose relation to `interval` is in `mode`, across all buckets.
    pub fn lookup(&self, interval: &Interval, mode: RelationMask) -> Vec<SharedCue> {
        let state = self.state.read();
        let mut out = Vec::new();
        for bucket in &state.buckets {
            out.extend(bucket.lookup(interval, mode));
        }
        out
    }

    pub fn get_cues_by_interval(&self, interval: &Interval, semantic: Semantic) -> Vec<SharedCue> {
        self.lookup(interval, semantic.mask())
    }

    /// `(endpoint, cue)` pairs for every cue endpoint inside `interval`.
    pub fn get_cue_points_by_interval(&self, interval: &Interval) -> Vec<(Endpoint, SharedCue)> {
        let state = self.state.read();
        let mut out = Vec::new();
        for bucket in &state.buckets {
            out.extend(bucket.lookup_points(interval));
        }
        out
    }

    /// Remove every cue matching `interval` under `semantic`. The emitted
    /// change records carry only the `old` snapshot.
    pub fn remove_cues_by_interval(&self, interval: &Interval, semantic: Semantic) -> ChangeBatch {
        let batch = {
            let mut state = self.state.write();
            let AxisState { cue_map, buckets } = &mut *state;
            let mut batch: ChangeBatch = HashMap::new();
            for bucket in buckets.iter_mut() {
                for cue in bucket.lookup_remove(interval, semantic) {
                    let old = cue.read().clone();
                    cue_map.remove(&old.key);
                    let delta = cue_delta(None, Some(&old), &UpdateOptions::default());
                    batch.insert(
                        old.key.clone(),
                        CueChange {
                            key: old.key.clone(),
                            new: None,
                            old: Some(old),
                            delta,
                        },
                    );
                }
            }
            batch
        };
        debug!("axis remove by interval: {} cue(s)", batch.len());
        self.notify(&batch);
        batch
    }

    /// Drop every cue and emit one delete batch.
    pub fn clear(&self) -> ChangeBatch {
        let batch = {
            let mut state = self.state.write();
            let AxisState { cue_map, buckets } = &mut *state;
            let mut batch: ChangeBatch = HashMap::with_capacity(cue_map.len());
            for (key, shared) in cue_map.drain() {
                let old = shared.read().clone();
                let delta = cue_delta(None, Some(&old), &UpdateOptions::default());
                batch.insert(
                    key.clone(),
                    CueChange {
                        key,
                        new: None,
                        old: Some(old),
                        delta,
                    },
                );
            }
            for bucket in buckets.iter_mut() {
                bucket.clear();
            }
            batch
        };
        self.notify(&batch);
        batch
    }

    pub fn has(&self, key: &str) -> bool {
        self.state.read().cue_map.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<SharedCue> {
        self.state.read().cue_map.get(key).map(SharedCue::clone)
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.read().cue_map.keys().cloned().collect()
    }

    pub fn cues(&self) -> Vec<SharedCue> {
        self.state
            .read()
            .cue_map
            .values()
            .map(SharedCue::clone)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().cue_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().cue_map.is_empty()
    }

    /// Subscribe to `change` batches. A subscriber joining a non-empty axis
    /// first receives the current cue set as one synthesized insert batch.
    pub fn on_change(
        &self,
        handler: impl Fn(&ChangeBatch) + Send + Sync + 'static,
    ) -> CallbackHandle {
        let init: ChangeBatch = {
            let state = self.state.read();
            state
                .cue_map
                .values()
                .map(|shared| {
                    let cue = shared.read().clone();
                    let delta = cue_delta(Some(&cue), None, &UpdateOptions::default());
                    (
                        cue.key.clone(),
                        CueChange {
                            key: cue.key.clone(),
                            new: Some(cue),
                            old: None,
                            delta,
                        },
                    )
                })
                .collect()
        };
        if !init.is_empty() {
            handler(&init);
        }
        self.callbacks.lock().subscribe(handler)
    }

    pub fn off_change(&self, handle: CallbackHandle) -> bool {
        self.callbacks.lock().unsubscribe(handle)
    }

    fn notify(&self, batch: &ChangeBatch) {
        if batch.is_empty() {
            return;
        }
        self.callbacks.lock().trigger(batch);
    }

    /// Cross-bucket invariant check, used by tests and diagnostics.
    pub fn check_integrity(&self) -> Result<AxisIntegrity> {
        let state = self.state.read();
        let mut reports = Vec::with_capacity(state.buckets.len());
        let mut bucketed: HashSet<String> = HashSet::new();
        for bucket in &state.buckets {
            let report = bucket.integrity()?;
            for key in &report.keys {
                if !bucketed.insert(key.clone()) {
                    return Err(AxisError::invariant(format!(
                        "cue {key} appears in more than one bucket"
                    )));
                }
            }
            reports.push(report);
        }
        for report in &reports {
            for key in &report.keys {
                let Some(shared) = state.cue_map.get(key) else {
                    return Err(AxisError::invariant(format!(
                        "bucketed cue {key} missing from cue map"
                    )));
                };
                let Some(interval) = shared.read().interval else {
                    return Err(AxisError::invariant(format!(
                        "bucketed cue {key} has no interval"
                    )));
                };
                let expected = BUCKET_CAPS
                    .iter()
                    .copied()
                    .find(|&cap| interval.length() <= cap)
                    .unwrap_or(f64::INFINITY);
                if expected != report.max_length {
                    return Err(AxisError::invariant(format!(
                        "cue {key} of length {} sits in cap {} instead of {}",
                        interval.length(),
                        report.max_length,
                        expected
                    )));
                }
            }
        }
        let with_interval = state
            .cue_map
            .values()
            .filter(|shared| shared.read().interval.is_some())
            .count();
        if with_interval != bucketed.len() {
            return Err(AxisError::invariant(format!(
                "{with_interval} cue(s) carry intervals but {} are bucketed",
                bucketed.len()
            )));
        }
        Ok(AxisIntegrity {
            cues: state.cue_map.len(),
            bucketed: bucketed.len(),
            buckets: reports,
        })
    }
}

impl Default for Axis {
    fn default() -> Self {
        Self::new()
    }
}

/// Diagnostic snapshot returned by [`Axis::check_integrity`].
#[derive(Debug)]
pub struct AxisIntegrity {
    pub cues: usize,
    pub bucketed: usize,
    pub buckets: Vec<BucketIntegrity>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cue_types::Relation;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cue(key: &str, low: f64, high: f64) -> Cue {
        Cue::new(key, Interval::closed(low, high).unwrap(), json!({}))
    }

    fn keys(cues: &[SharedCue]) -> Vec<String> {
        let mut keys: Vec<String> = cues.iter().map(|c| c.read().key.clone()).collect();
        keys.sort();
        keys
    }

    #[test]
    fn insert_and_query() {
        let axis = Axis::new();
        axis.update([cue("a", 3.0, 4.0)], &UpdateOptions::default())
            .unwrap();

        let hit = axis.get_cues_by_interval(&Interval::closed(3.5, 3.6).unwrap(), Semantic::Overlap);
        assert_eq!(keys(&hit), vec!["a"]);

        let miss = axis.get_cues_by_interval(&Interval::closed(5.0, 6.0).unwrap(), Semantic::Overlap);
        assert!(miss.is_empty());
        axis.check_integrity().unwrap();
    }

    #[test]
    fn bucket_crossover_on_length_change() {
        let axis = Axis::new();
        axis.update([cue("b", 0.0, 5.0)], &UpdateOptions::default())
            .unwrap();
        let report = axis.check_integrity().unwrap();
        assert!(report.buckets[0].keys.contains("b")); // cap 10

        let batch = axis
            .update([cue("b", 0.0, 50.0)], &UpdateOptions::default())
            .unwrap();
        assert_eq!(batch["b"].delta.interval, DeltaKind::Replace);

        let report = axis.check_integrity().unwrap();
        assert!(report.buckets[0].keys.is_empty());
        assert!(report.buckets[1].keys.contains("b")); // cap 100
    }

    #[test]
    fn covers_only_reaches_longer_cues() {
        let axis = Axis::new();
        axis.update([cue("c", 0.0, 500.0)], &UpdateOptions::default())
            .unwrap();

        let query = Interval::closed(100.0, 101.0).unwrap();
        let covers = axis.lookup(&query, Relation::Covers.into());
        assert_eq!(keys(&covers), vec!["c"]);

        let non_covers = axis.lookup(&query, RelationMask::NON_COVERS);
        assert!(non_covers.is_empty());
    }

    #[test]
    fn unbounded_query_low_is_answered_not_panicked() {
        let query = Interval::new(f64::NEG_INFINITY, 5.0, true, true).unwrap();

        // a fresh axis still runs the covers scan over its terminal bucket
        let axis = Axis::new();
        assert!(axis.get_cues_by_interval(&query, Semantic::Overlap).is_empty());
        assert!(axis.lookup(&query, Relation::Covers.into()).is_empty());

        axis.update(
            [
                Cue::new(
                    "tail",
                    Interval::new(f64::NEG_INFINITY, 1.0, true, true).unwrap(),
                    json!({}),
                ),
                cue("mid", 2.0, 3.0),
                cue("far", 80.0, 90.0),
            ],
            &UpdateOptions::default(),
        )
        .unwrap();

        let hit = axis.get_cues_by_interval(&query, Semantic::Overlap);
        assert_eq!(keys(&hit), vec!["mid", "tail"]);

        let batch = axis.remove_cues_by_interval(&query, Semantic::Overlap);
        assert_eq!(batch.len(), 2);
        assert!(!axis.has("tail"));
        assert!(axis.has("far"));
        axis.check_integrity().unwrap();
    }

    #[test]
    fn partial_update_merges_components() {
        let axis = Axis::new();
        axis.update(
            [Cue::new("d", Interval::closed(1.0, 2.0).unwrap(), json!({"x": 1}))],
            &UpdateOptions::default(),
        )
        .unwrap();

        let batch = axis
            .update(
                [Cue {
                    key: "d".to_string(),
                    interval: None,
                    data: Some(json!({"x": 2})),
                }],
                &UpdateOptions::default(),
            )
            .unwrap();

        let record = &batch["d"];
        assert_eq!(record.delta.interval, DeltaKind::Noop);
        assert_eq!(record.delta.data, DeltaKind::Replace);

        let stored = axis.get("d").unwrap();
        assert_eq!(
            stored.read().interval,
            Some(Interval::closed(1.0, 2.0).unwrap())
        );
        assert_eq!(stored.read().data, Some(json!({"x": 2})));
        axis.check_integrity().unwrap();
    }

    #[test]
    fn replace_mutates_in_place() {
        let axis = Axis::new();
        axis.update(
            [Cue::new("e", Interval::closed(0.0, 1.0).unwrap(), json!(1))],
            &UpdateOptions::default(),
        )
        .unwrap();
        let held = axis.get("e").unwrap();

        axis.update(
            [Cue {
                key: "e".to_string(),
                interval: None,
                data: Some(json!(2)),
            }],
            &UpdateOptions::default(),
        )
        .unwrap();

        // the handle taken before the update sees the new data
        assert_eq!(held.read().data, Some(json!(2)));
    }

    #[test]
    fn tombstone_restores_prior_state() {
        let axis = Axis::new();
        axis.update([cue("a", 1.0, 2.0)], &UpdateOptions::default())
            .unwrap();
        let batch = axis
            .update([Cue::tombstone("a")], &UpdateOptions::default())
            .unwrap();

        assert_eq!(batch["a"].delta.interval, DeltaKind::Delete);
        assert_eq!(batch["a"].delta.data, DeltaKind::Delete);
        assert!(batch["a"].new.is_none());
        assert!(axis.is_empty());
        assert_eq!(axis.check_integrity().unwrap().bucketed, 0);
    }

    #[test]
    fn repeated_key_keeps_first_old() {
        let axis = Axis::new();
        axis.update([cue("x", 1.0, 2.0)], &UpdateOptions::default())
            .unwrap();

        let batch = axis
            .update(
                [Cue::tombstone("x"), cue("x", 3.0, 4.0)],
                &UpdateOptions::default(),
            )
            .unwrap();

        let record = &batch["x"];
        // old is the pre-batch cue, not the intermediate delete
        assert_eq!(
            record.old.as_ref().unwrap().interval,
            Some(Interval::closed(1.0, 2.0).unwrap())
        );
        assert_eq!(
            record.new.as_ref().unwrap().interval,
            Some(Interval::closed(3.0, 4.0).unwrap())
        );
        assert_eq!(record.delta.interval, DeltaKind::Replace);
        axis.check_integrity().unwrap();
    }

    #[test]
    fn noop_update_emits_noop_record() {
        let axis = Axis::new();
        axis.update([cue("n", 1.0, 2.0)], &UpdateOptions::default())
            .unwrap();
        let batch = axis
            .update([cue("n", 1.0, 2.0)], &UpdateOptions::default())
            .unwrap();
        assert!(batch["n"].delta.is_noop());
        assert_eq!(batch["n"].new, batch["n"].old);
    }

    #[test]
    fn check_aborts_before_mutation() {
        let axis = Axis::new();
        let options = UpdateOptions {
            check: true,
            equals: None,
        };
        let err = axis
            .update([cue("ok", 1.0, 2.0), cue("", 3.0, 4.0)], &options)
            .unwrap_err();
        assert!(matches!(err, AxisError::InvalidArgument { .. }));
        assert!(axis.is_empty());
        assert_eq!(axis.check_integrity().unwrap().bucketed, 0);
    }

    #[test]
    fn custom_data_equality() {
        let axis = Axis::new();
        axis.update(
            [Cue::new("q", Interval::closed(0.0, 1.0).unwrap(), json!({"v": 1, "noise": 1}))],
            &UpdateOptions::default(),
        )
        .unwrap();

        // comparator that only looks at "v" sees no change
        let options = UpdateOptions {
            check: false,
            equals: Some(Arc::new(|a: &Value, b: &Value| a["v"] == b["v"])),
        };
        let batch = axis
            .update(
                [Cue::new("q", Interval::closed(0.0, 1.0).unwrap(), json!({"v": 1, "noise": 2}))],
                &options,
            )
            .unwrap();
        assert!(batch["q"].delta.is_noop());
    }

    #[test]
    fn remove_by_interval_emits_old_only() {
        let axis = Axis::new();
        axis.update(
            [cue("in", 1.0, 2.0), cue("out", 8.0, 9.0)],
            &UpdateOptions::default(),
        )
        .unwrap();

        let batch = axis.remove_cues_by_interval(&Interval::closed(0.0, 3.0).unwrap(), Semantic::Inside);
        assert_eq!(batch.len(), 1);
        let record = &batch["in"];
        assert!(record.new.is_none());
        assert_eq!(record.old.as_ref().unwrap().key, "in");
        assert_eq!(record.delta.interval, DeltaKind::Delete);

        assert!(!axis.has("in"));
        assert!(axis.has("out"));
        axis.check_integrity().unwrap();
    }

    #[test]
    fn overlap_semantic_matches_explicit_mask() {
        let axis = Axis::new();
        axis.update(
            [
                cue("left", 0.0, 4.0),
                cue("inside", 4.5, 5.0),
                cue("cover", 3.0, 20.0),
                cue("right", 5.5, 8.0),
                cue("far", 40.0, 50.0),
            ],
            &UpdateOptions::default(),
        )
        .unwrap();

        let query = Interval::closed(4.0, 6.0).unwrap();
        let mask = RelationMask::EMPTY
            .with(Relation::OverlapLeft)
            .with(Relation::Covered)
            .with(Relation::Equals)
            .with(Relation::Covers)
            .with(Relation::OverlapRight);
        assert_eq!(
            keys(&axis.get_cues_by_interval(&query, Semantic::Overlap)),
            keys(&axis.lookup(&query, mask))
        );
        assert_eq!(
            keys(&axis.get_cues_by_interval(&query, Semantic::Overlap)),
            vec!["cover", "inside", "left", "right"]
        );
    }

    #[test]
    fn change_event_replays_initial_state() {
        let axis = Axis::new();
        axis.update([cue("pre", 1.0, 2.0)], &UpdateOptions::default())
            .unwrap();

        let seen = Arc::new(AtomicUsize::new(0));
        let seen_in_handler = Arc::clone(&seen);
        let handle = axis.on_change(move |batch| {
            seen_in_handler.fetch_add(batch.len(), Ordering::Relaxed);
        });
        // init replay delivered the pre-existing cue
        assert_eq!(seen.load(Ordering::Relaxed), 1);

        axis.update([cue("live", 3.0, 4.0)], &UpdateOptions::default())
            .unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 2);

        assert!(axis.off_change(handle));
        axis.update([cue("after", 5.0, 6.0)], &UpdateOptions::default())
            .unwrap();
        assert_eq!(seen.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn batch_replays_against_mirror() {
        let options = UpdateOptions::default();
        let seed = [cue("a", 1.0, 2.0), cue("b", 5.0, 9.0)];

        let axis = Axis::new();
        axis.update(seed.clone(), &options).unwrap();
        let mirror = Axis::new();
        mirror.update(seed, &options).unwrap();

        let batch = axis
            .update(
                [Cue::tombstone("a"), cue("b", 5.0, 50.0), cue("c", 0.0, 1.0)],
                &options,
            )
            .unwrap();

        // applying each record's end state reproduces the axis on the mirror
        let replay: Vec<Cue> = batch
            .values()
            .map(|record| match &record.new {
                Some(cue) => cue.clone(),
                None => Cue::tombstone(record.key.clone()),
            })
            .collect();
        mirror.update(replay, &options).unwrap();

        let mut axis_keys = axis.keys();
        axis_keys.sort();
        let mut mirror_keys = mirror.keys();
        mirror_keys.sort();
        assert_eq!(axis_keys, mirror_keys);
        for key in axis_keys {
            assert_eq!(
                axis.get(&key).unwrap().read().interval,
                mirror.get(&key).unwrap().read().interval
            );
        }
        mirror.check_integrity().unwrap();
    }

    #[test]
    fn clear_empties_everything() {
        let axis = Axis::new();
        axis.update(
            [cue("a", 1.0, 2.0), cue("b", 20.0, 90.0)],
            &UpdateOptions::default(),
        )
        .unwrap();
        let batch = axis.clear();
        assert_eq!(batch.len(), 2);
        assert!(axis.is_empty());
        assert_eq!(axis.check_integrity().unwrap().bucketed, 0);
    }

    #[test]
    fn data_only_cue_stays_out_of_buckets() {
        let axis = Axis::new();
        axis.update(
            [Cue {
                key: "meta".to_string(),
                interval: None,
                data: Some(json!("note")),
            }],
            &UpdateOptions::default(),
        )
        .unwrap();
        assert!(axis.has("meta"));
        let report = axis.check_integrity().unwrap();
        assert_eq!(report.cues, 1);
        assert_eq!(report.bucketed, 0);
    }
}
