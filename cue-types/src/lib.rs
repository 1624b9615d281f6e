// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Shared value types for the timeline cue workspace.
//!
//! The crate exposes:
//! - [`Interval`]: closed/open interval value type with the relation
//!   classifier used by every query path.
//! - [`Endpoint`]: value-plus-side pair with closedness and the total
//!   endpoint order.
//! - [`Relation`] / [`RelationMask`] / [`Semantic`]: the Allen-style working
//!   set and the named sets built from it.
//! - [`Cue`] plus the delta/change records emitted by axis update batches.

pub mod cue;
pub mod endpoint;
pub mod interval;
pub mod relation;

pub use cue::{ChangeBatch, Cue, CueChange, CueDelta, DeltaKind, SharedCue};
pub use endpoint::{Endpoint, EndpointSide};
pub use interval::{Interval, IntervalError};
pub use relation::{Relation, RelationMask, Semantic};
