//! Identifiers and row types for the closure table.
//!
//! A [`ClosureEdge`] is one reachability fact: `start` reaches `end` along
//! one particular path. Rows with `hops == 0` are direct edges requested by
//! a caller; every other row is derived and records which rows it was
//! stitched together from:
//!
//! ```text
//!   start ──entry──▶ parent ──direct──▶ child ──exit──▶ end
//! ```
//!
//! An empty prefix or suffix is expressed by pointing `entry_edge_id` or
//! `exit_edge_id` at the direct row itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a group. The store never creates or destroys groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(i64);

impl VertexId {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl From<i64> for VertexId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of one closure row. Stable for the row's lifetime, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(i64);

impl EdgeId {
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A persisted closure row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosureEdge {
    pub id: EdgeId,
    pub start: VertexId,
    pub end: VertexId,
    /// `0` for a direct edge. A derived row carries `1` plus the hops of the
    /// entry and exit rows it was built from (sides equal to the direct row
    /// contribute nothing).
    pub hops: u32,
    /// Row supplying the path from `start` into the direct edge's parent.
    pub entry_edge_id: EdgeId,
    /// Row supplying the path out of the direct edge's child to `end`.
    pub exit_edge_id: EdgeId,
    /// The direct row whose removal removes this row.
    pub direct_edge_id: EdgeId,
}

impl ClosureEdge {
    /// Build the row for a freshly requested direct edge.
    #[must_use]
    pub const fn direct(id: EdgeId, parent: VertexId, child: VertexId) -> Self {
        Self {
            id,
            start: parent,
            end: child,
            hops: 0,
            entry_edge_id: id,
            exit_edge_id: id,
            direct_edge_id: id,
        }
    }

    #[must_use]
    pub const fn is_direct(&self) -> bool {
        self.hops == 0
    }

    /// Provenance rows other than this row itself.
    pub fn supports(&self) -> impl Iterator<Item = EdgeId> + '_ {
        [self.entry_edge_id, self.exit_edge_id]
            .into_iter()
            .filter(move |id| *id != self.id && *id != self.direct_edge_id)
    }
}

/// A derived row planned for insertion. Its id is assigned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedRow {
    pub start: VertexId,
    pub end: VertexId,
    pub hops: u32,
    pub entry_edge_id: EdgeId,
    pub exit_edge_id: EdgeId,
    pub direct_edge_id: EdgeId,
}

impl DerivedRow {
    #[must_use]
    pub const fn with_id(self, id: EdgeId) -> ClosureEdge {
        ClosureEdge {
            id,
            start: self.start,
            end: self.end,
            hops: self.hops,
            entry_edge_id: self.entry_edge_id,
            exit_edge_id: self.exit_edge_id,
            direct_edge_id: self.direct_edge_id,
        }
    }
}

/// A caller-requested parent/child relation, used for import and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DirectEdge {
    pub parent: VertexId,
    pub child: VertexId,
}

impl DirectEdge {
    #[must_use]
    pub const fn new(parent: VertexId, child: VertexId) -> Self {
        Self { parent, child }
    }
}

impl From<&ClosureEdge> for DirectEdge {
    fn from(row: &ClosureEdge) -> Self {
        Self {
            parent: row.start,
            child: row.end,
        }
    }
}

impl fmt::Display for DirectEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.parent, self.child)
    }
}
