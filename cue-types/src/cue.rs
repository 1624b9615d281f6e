// Copyright (c) James Kassemi, SC, US. All rights reserved.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;

use crate::interval::Interval;

/// Keyed record with an interval and user data. Identity is `key`; a cue with
/// both fields absent is a tombstone (delete).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cue {
    pub key: String,
    pub interval: Option<Interval>,
    pub data: Option<Value>,
}

impl Cue {
    pub fn new(key: impl Into<String>, interval: Interval, data: Value) -> Self {
        Self {
            key: key.into(),
            interval: Some(interval),
            data: Some(data),
        }
    }

    pub fn tombstone(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            interval: None,
            data: None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.interval.is_none() && self.data.is_none()
    }

    pub fn into_shared(self) -> SharedCue {
        Arc::new(RwLock::new(self))
    }
}

/// Live cue handle. Buckets and consumers share the same allocation, so a
/// replace mutates in place and stays visible to every holder.
pub type SharedCue = Arc<RwLock<Cue>>;

/// Per-component transition of a cue across one update.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DeltaKind {
    Noop,
    Insert,
    Replace,
    Delete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CueDelta {
    pub interval: DeltaKind,
    pub data: DeltaKind,
}

impl CueDelta {
    pub const NOOP: Self = Self {
        interval: DeltaKind::Noop,
        data: DeltaKind::Noop,
    };

    pub fn is_noop(&self) -> bool {
        *self == Self::NOOP
    }
}

/// One record of an update batch: snapshots of the cue before and after,
/// plus the per-component delta between them.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CueChange {
    pub key: String,
    pub new: Option<Cue>,
    pub old: Option<Cue>,
    pub delta: CueDelta,
}

/// Payload of an axis `change` dispatch, keyed by cue key.
pub type ChangeBatch = HashMap<String, CueChange>;
