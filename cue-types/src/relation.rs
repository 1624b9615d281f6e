// Copyright (c) James Kassemi, SC, US. All rights reserved.

use serde::{Deserialize, Serialize};

/// Interval relation working set. Each cue interval classifies against a
/// query interval as exactly one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Relation {
    /// Entirely left of the query.
    OutsideLeft,
    /// Partial overlap, this interval starts earlier.
    OverlapLeft,
    /// This interval lies inside the query.
    Covered,
    /// Identical value and closedness on both sides.
    Equals,
    /// This interval contains the query.
    Covers,
    /// Partial overlap, this interval starts later.
    OverlapRight,
    /// Entirely right of the query.
    OutsideRight,
}

impl Relation {
    pub const fn bit(self) -> u8 {
        match self {
            Relation::OutsideLeft => 64,
            Relation::OverlapLeft => 32,
            Relation::Covered => 16,
            Relation::Equals => 8,
            Relation::Covers => 4,
            Relation::OverlapRight => 2,
            Relation::OutsideRight => 1,
        }
    }
}

/// Set of [`Relation`] values, used as the query mode for interval lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationMask(u8);

impl RelationMask {
    pub const EMPTY: Self = Self(0);
    pub const EQUALS: Self = Self(Relation::Equals.bit());
    /// Relations reachable by scanning the query span itself.
    pub const NON_COVERS: Self = Self(
        Relation::OverlapLeft.bit()
            | Relation::Covered.bit()
            | Relation::Equals.bit()
            | Relation::OverlapRight.bit(),
    );
    pub const INSIDE: Self = Self(Relation::Covered.bit() | Relation::Equals.bit());
    pub const PARTIAL: Self =
        Self(Self::INSIDE.0 | Relation::OverlapLeft.bit() | Relation::OverlapRight.bit());
    pub const OVERLAP: Self = Self(Self::PARTIAL.0 | Relation::Covers.bit());

    pub const fn with(self, relation: Relation) -> Self {
        Self(self.0 | relation.bit())
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub fn contains(self, relation: Relation) -> bool {
        self.0 & relation.bit() != 0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<Relation> for RelationMask {
    fn from(relation: Relation) -> Self {
        Self(relation.bit())
    }
}

/// Named relation sets exposed on the high-level query surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Semantic {
    /// `{COVERED, EQUALS}`
    Inside,
    /// `INSIDE ∪ {OVERLAP_LEFT, OVERLAP_RIGHT}`
    Partial,
    /// `PARTIAL ∪ {COVERS}`
    Overlap,
}

impl Semantic {
    pub const fn mask(self) -> RelationMask {
        match self {
            Semantic::Inside => RelationMask::INSIDE,
            Semantic::Partial => RelationMask::PARTIAL,
            Semantic::Overlap => RelationMask::OVERLAP,
        }
    }
}
