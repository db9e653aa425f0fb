//! Closure-table storage of the group hierarchy.
//!
//! The closure table holds one row per path between two groups, so every
//! ancestry question is a single lookup and never a graph walk. Keeping it
//! correct is the job of the mutation protocol:
//!
//! - [`guard`] rejects an edge that would close a cycle and short-circuits
//!   edges that already exist.
//! - [`derive`] plans every row implied by a new direct edge from a snapshot
//!   of the rows touching its endpoints.
//! - [`retract`] finds every row whose provenance chain leads back to a
//!   removed direct edge.
//!
//! Backends ([`memory::MemoryClosureStore`], [`crate::db::SqliteClosureStore`])
//! own the rows and apply each mutation as one atomic unit.

pub mod derive;
pub mod guard;
pub mod memory;
pub mod retract;
pub mod shared;

use crate::error::GraphError;
use crate::model::{ClosureEdge, DirectEdge, EdgeId, VertexId};

pub use guard::{Admission, Reachability};
pub use memory::MemoryClosureStore;
pub use shared::SharedClosureStore;

/// The query and mutation contract every closure backend provides.
pub trait ClosureStore {
    /// Make `child` a direct subgroup of `parent`.
    ///
    /// Returns the existing id unchanged when the direct edge is already
    /// present.
    ///
    /// # Errors
    ///
    /// [`GraphError::Cycle`] when `parent` is reachable from `child` (or the
    /// two are equal); [`GraphError::Storage`] on backend failure.
    fn add_edge(&mut self, parent: VertexId, child: VertexId) -> Result<EdgeId, GraphError>;

    /// Remove the direct edge `parent -> child` and every row derived through
    /// it. A missing edge is a no-op.
    ///
    /// # Errors
    ///
    /// [`GraphError::Storage`] on backend failure.
    fn remove_edge(&mut self, parent: VertexId, child: VertexId) -> Result<(), GraphError>;

    /// Every group reachable from `vertex`, ascending, each listed once.
    ///
    /// # Errors
    ///
    /// [`GraphError::Storage`] on backend failure.
    fn descendants(&self, vertex: VertexId) -> Result<Vec<VertexId>, GraphError>;

    /// Every group that reaches `vertex`, ascending, each listed once.
    ///
    /// # Errors
    ///
    /// [`GraphError::Storage`] on backend failure.
    fn ancestors(&self, vertex: VertexId) -> Result<Vec<VertexId>, GraphError>;

    /// `true` when `a` is reachable from `b`.
    ///
    /// # Errors
    ///
    /// [`GraphError::Storage`] on backend failure.
    fn is_descendant(&self, a: VertexId, b: VertexId) -> Result<bool, GraphError>;

    /// `true` when `b` is reachable from `a`.
    ///
    /// # Errors
    ///
    /// [`GraphError::Storage`] on backend failure.
    fn is_ancestor(&self, a: VertexId, b: VertexId) -> Result<bool, GraphError> {
        self.is_descendant(b, a)
    }

    /// Id of the direct row `parent -> child`, if any.
    ///
    /// # Errors
    ///
    /// [`GraphError::Storage`] on backend failure.
    fn direct_edge_id(
        &self,
        parent: VertexId,
        child: VertexId,
    ) -> Result<Option<EdgeId>, GraphError>;

    /// Direct subgroups of `vertex`, ascending.
    ///
    /// # Errors
    ///
    /// [`GraphError::Storage`] on backend failure.
    fn children(&self, vertex: VertexId) -> Result<Vec<VertexId>, GraphError>;

    /// Direct supergroups of `vertex`, ascending.
    ///
    /// # Errors
    ///
    /// [`GraphError::Storage`] on backend failure.
    fn parents(&self, vertex: VertexId) -> Result<Vec<VertexId>, GraphError>;

    /// `true` when any row starts or ends at `vertex`.
    ///
    /// # Errors
    ///
    /// [`GraphError::Storage`] on backend failure.
    fn contains_vertex(&self, vertex: VertexId) -> Result<bool, GraphError>;

    /// Every closure row, ordered by id.
    ///
    /// # Errors
    ///
    /// [`GraphError::Storage`] on backend failure.
    fn rows(&self) -> Result<Vec<ClosureEdge>, GraphError>;

    /// Every direct edge, ordered by the id of its row.
    ///
    /// # Errors
    ///
    /// [`GraphError::Storage`] on backend failure.
    fn direct_edges(&self) -> Result<Vec<DirectEdge>, GraphError> {
        Ok(self
            .rows()?
            .iter()
            .filter(|row| row.is_direct())
            .map(DirectEdge::from)
            .collect())
    }

    /// Drop every row.
    ///
    /// # Errors
    ///
    /// [`GraphError::Storage`] on backend failure.
    fn clear(&mut self) -> Result<(), GraphError>;

    /// Drop every row and re-add `edges` in order, deriving the closure
    /// afresh. Ids keep increasing across the replacement.
    ///
    /// The default runs [`clear`](Self::clear) and then one
    /// [`add_edge`](Self::add_edge) per edge; backends override it to make
    /// the whole replacement one atomic unit.
    ///
    /// # Errors
    ///
    /// [`GraphError::Cycle`] when `edges` contain a cycle;
    /// [`GraphError::Storage`] on backend failure.
    fn replace_edges(&mut self, edges: &[DirectEdge]) -> Result<(), GraphError> {
        self.clear()?;
        for edge in edges {
            self.add_edge(edge.parent, edge.child)?;
        }
        Ok(())
    }
}
