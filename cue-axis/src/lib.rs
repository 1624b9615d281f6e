//! Interval-indexed cue store.
//!
//! [`Axis`] is the authoritative key → cue map plus a partitioning of cues by
//! interval length into capped [`CueBucket`]s, so that "covers" queries touch
//! only buckets whose cap can contain the query. All writes funnel through
//! [`Axis::update`]; observers subscribe to the `change` batch it emits.
//!
//! The crate exposes:
//! - [`EndpointIndex`]: sorted point set with range lookup and bulk update.
//! - [`CueBucket`]: length-capped point map + index with staged batching.
//! - [`Axis`]: sharded bucket collection with batched updates and change
//!   notifications.

pub mod axis;
pub mod bucket;
pub mod error;
pub mod index;

pub use axis::{Axis, AxisIntegrity, DataEquals, UpdateOptions};
pub use bucket::{BucketIntegrity, CueBucket};
pub use error::{AxisError, Result};
pub use index::EndpointIndex;
