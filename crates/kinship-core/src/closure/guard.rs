//! Admission check run before every edge insertion.
//!
//! With a complete closure table, "would `parent -> child` close a cycle?"
//! is a single existence lookup: the edge closes a cycle exactly when some
//! row already leads from `child` to `parent`. No graph walk happens at
//! mutation time. A self-loop is a cycle of length one and is rejected here
//! as well.

use crate::error::GraphError;
use crate::model::{EdgeId, VertexId};

/// Point lookups the guard needs from a backend.
pub trait Reachability {
    /// Id of the direct row `parent -> child`, if present.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn direct_edge(&self, parent: VertexId, child: VertexId) -> Result<Option<EdgeId>, GraphError>;

    /// `true` when at least one row leads from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Backend failure.
    fn reaches(&self, from: VertexId, to: VertexId) -> Result<bool, GraphError>;
}

/// Outcome of a successful admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The direct edge already exists; return its id and change nothing.
    Existing(EdgeId),
    /// The edge is new and safe to insert.
    Insert,
}

/// Decide whether `parent -> child` may be inserted.
///
/// # Errors
///
/// [`GraphError::Cycle`] when `parent == child` or `child` already reaches
/// `parent`; backend errors from the lookups.
pub fn admit<R>(reader: &R, parent: VertexId, child: VertexId) -> Result<Admission, GraphError>
where
    R: Reachability + ?Sized,
{
    if parent == child {
        return Err(GraphError::Cycle { parent, child });
    }

    if let Some(existing) = reader.direct_edge(parent, child)? {
        return Ok(Admission::Existing(existing));
    }

    // A reverse direct edge shows up here too: child -> parent is a path.
    if reader.reaches(child, parent)? {
        return Err(GraphError::Cycle { parent, child });
    }

    Ok(Admission::Insert)
}
