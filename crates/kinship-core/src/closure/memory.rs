//! In-memory closure table.
//!
//! Rows live in an arena keyed by [`EdgeId`]. Secondary indexes mirror what
//! a relational backend would index (`start`, `end`, `direct_edge_id`, and
//! the entry/exit back-references), plus a per-pair path count so that
//! reachability is a single hash lookup.
//!
//! Mutations compute everything they need from the current rows before
//! touching them, so a mutation either applies completely or (on a cycle)
//! not at all.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, info};

use crate::alloc::EdgeIdAllocator;
use crate::closure::derive::derive_rows;
use crate::closure::guard::{self, Admission, Reachability};
use crate::closure::retract::collect_retraction;
use crate::closure::ClosureStore;
use crate::error::GraphError;
use crate::model::{ClosureEdge, DirectEdge, EdgeId, VertexId};

type IdSet = BTreeSet<EdgeId>;

/// A closure table held entirely in process memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryClosureStore {
    rows: BTreeMap<EdgeId, ClosureEdge>,
    by_start: HashMap<VertexId, IdSet>,
    by_end: HashMap<VertexId, IdSet>,
    by_direct: HashMap<EdgeId, IdSet>,
    /// Rows naming the key as their entry or exit row.
    referrers: HashMap<EdgeId, IdSet>,
    direct: HashMap<(VertexId, VertexId), EdgeId>,
    /// Number of rows (paths) per `(start, end)` pair.
    paths: HashMap<(VertexId, VertexId), usize>,
    ids: EdgeIdAllocator,
}

impl MemoryClosureStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows, direct and derived.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Look up one row.
    #[must_use]
    pub fn row(&self, id: EdgeId) -> Option<&ClosureEdge> {
        self.rows.get(&id)
    }

    /// Number of distinct paths from `start` to `end`.
    #[must_use]
    pub fn path_count(&self, start: VertexId, end: VertexId) -> usize {
        self.paths.get(&(start, end)).copied().unwrap_or(0)
    }

    fn rows_in<'a>(&'a self, ids: Option<&'a IdSet>) -> impl Iterator<Item = &'a ClosureEdge> + 'a {
        ids.into_iter()
            .flatten()
            .filter_map(|id| self.rows.get(id))
    }

    fn distinct(vertices: impl Iterator<Item = VertexId>) -> Vec<VertexId> {
        vertices.collect::<BTreeSet<_>>().into_iter().collect()
    }

    fn insert_row(&mut self, row: ClosureEdge) {
        self.by_start.entry(row.start).or_default().insert(row.id);
        self.by_end.entry(row.end).or_default().insert(row.id);
        self.by_direct
            .entry(row.direct_edge_id)
            .or_default()
            .insert(row.id);
        for support in row.supports() {
            self.referrers.entry(support).or_default().insert(row.id);
        }
        if row.is_direct() {
            self.direct.insert((row.start, row.end), row.id);
        }
        *self.paths.entry((row.start, row.end)).or_default() += 1;
        self.rows.insert(row.id, row);
    }

    fn delete_row(&mut self, id: EdgeId) {
        let Some(row) = self.rows.remove(&id) else {
            return;
        };
        detach(&mut self.by_start, row.start, id);
        detach(&mut self.by_end, row.end, id);
        detach(&mut self.by_direct, row.direct_edge_id, id);
        for support in row.supports() {
            detach(&mut self.referrers, support, id);
        }
        self.referrers.remove(&id);
        if row.is_direct() {
            self.direct.remove(&(row.start, row.end));
        }
        if let Some(count) = self.paths.get_mut(&(row.start, row.end)) {
            *count -= 1;
            if *count == 0 {
                self.paths.remove(&(row.start, row.end));
            }
        }
    }

    /// Add the direct edge `parent -> child` and every row it implies.
    ///
    /// # Errors
    ///
    /// [`GraphError::Cycle`] if the edge would close a cycle.
    pub fn add_edge(&mut self, parent: VertexId, child: VertexId) -> Result<EdgeId, GraphError> {
        if let Admission::Existing(id) = guard::admit(&*self, parent, child)? {
            return Ok(id);
        }

        let incoming: Vec<ClosureEdge> = self
            .rows_in(self.by_end.get(&parent))
            .copied()
            .collect();
        let outgoing: Vec<ClosureEdge> = self
            .rows_in(self.by_start.get(&child))
            .copied()
            .collect();

        let direct = ClosureEdge::direct(self.ids.allocate(), parent, child);
        let planned = derive_rows(&direct, &incoming, &outgoing);
        debug!(
            %parent,
            %child,
            edge_id = %direct.id,
            incoming = incoming.len(),
            outgoing = outgoing.len(),
            derived = planned.len(),
            "planned closure rows"
        );

        self.insert_row(direct);
        let derived = planned.len();
        for row in planned {
            let id = self.ids.allocate();
            self.insert_row(row.with_id(id));
        }

        info!(%parent, %child, edge_id = %direct.id, derived, "added edge");
        Ok(direct.id)
    }

    /// Remove the direct edge `parent -> child` and every row derived through
    /// it. Returns the number of rows deleted (`0` when the edge is absent).
    pub fn retract_edge(&mut self, parent: VertexId, child: VertexId) -> usize {
        let Some(edge_id) = self.direct.get(&(parent, child)).copied() else {
            debug!(%parent, %child, "no direct edge to remove");
            return 0;
        };

        let seed = self.by_direct.get(&edge_id).cloned().unwrap_or_default();
        let doomed = match collect_retraction::<std::convert::Infallible, _>(seed, |id| {
            Ok(self
                .referrers
                .get(&id)
                .map(|ids| ids.iter().copied().collect())
                .unwrap_or_default())
        }) {
            Ok(doomed) => doomed,
            Err(never) => match never {},
        };

        let removed = doomed.len();
        for id in doomed {
            self.delete_row(id);
        }

        info!(%parent, %child, edge_id = %edge_id, removed, "removed edge");
        removed
    }

    /// Every group reachable from `vertex`.
    #[must_use]
    pub fn descendants(&self, vertex: VertexId) -> Vec<VertexId> {
        Self::distinct(self.rows_in(self.by_start.get(&vertex)).map(|row| row.end))
    }

    /// Every group that reaches `vertex`.
    #[must_use]
    pub fn ancestors(&self, vertex: VertexId) -> Vec<VertexId> {
        Self::distinct(self.rows_in(self.by_end.get(&vertex)).map(|row| row.start))
    }

    /// `true` when `a` is reachable from `b`.
    #[must_use]
    pub fn is_descendant(&self, a: VertexId, b: VertexId) -> bool {
        self.paths.contains_key(&(b, a))
    }

    /// `true` when `b` is reachable from `a`.
    #[must_use]
    pub fn is_ancestor(&self, a: VertexId, b: VertexId) -> bool {
        self.is_descendant(b, a)
    }

    #[must_use]
    pub fn children(&self, vertex: VertexId) -> Vec<VertexId> {
        Self::distinct(
            self.rows_in(self.by_start.get(&vertex))
                .filter(|row| row.is_direct())
                .map(|row| row.end),
        )
    }

    #[must_use]
    pub fn parents(&self, vertex: VertexId) -> Vec<VertexId> {
        Self::distinct(
            self.rows_in(self.by_end.get(&vertex))
                .filter(|row| row.is_direct())
                .map(|row| row.start),
        )
    }
}

fn detach<K: std::hash::Hash + Eq>(index: &mut HashMap<K, IdSet>, key: K, id: EdgeId) {
    if let Some(ids) = index.get_mut(&key) {
        ids.remove(&id);
        if ids.is_empty() {
            index.remove(&key);
        }
    }
}

impl Reachability for MemoryClosureStore {
    fn direct_edge(&self, parent: VertexId, child: VertexId) -> Result<Option<EdgeId>, GraphError> {
        Ok(self.direct.get(&(parent, child)).copied())
    }

    fn reaches(&self, from: VertexId, to: VertexId) -> Result<bool, GraphError> {
        Ok(self.paths.contains_key(&(from, to)))
    }
}

impl ClosureStore for MemoryClosureStore {
    fn add_edge(&mut self, parent: VertexId, child: VertexId) -> Result<EdgeId, GraphError> {
        Self::add_edge(self, parent, child)
    }

    fn remove_edge(&mut self, parent: VertexId, child: VertexId) -> Result<(), GraphError> {
        Self::retract_edge(self, parent, child);
        Ok(())
    }

    fn descendants(&self, vertex: VertexId) -> Result<Vec<VertexId>, GraphError> {
        Ok(Self::descendants(self, vertex))
    }

    fn ancestors(&self, vertex: VertexId) -> Result<Vec<VertexId>, GraphError> {
        Ok(Self::ancestors(self, vertex))
    }

    fn is_descendant(&self, a: VertexId, b: VertexId) -> Result<bool, GraphError> {
        Ok(Self::is_descendant(self, a, b))
    }

    fn direct_edge_id(
        &self,
        parent: VertexId,
        child: VertexId,
    ) -> Result<Option<EdgeId>, GraphError> {
        Ok(self.direct.get(&(parent, child)).copied())
    }

    fn children(&self, vertex: VertexId) -> Result<Vec<VertexId>, GraphError> {
        Ok(Self::children(self, vertex))
    }

    fn parents(&self, vertex: VertexId) -> Result<Vec<VertexId>, GraphError> {
        Ok(Self::parents(self, vertex))
    }

    fn contains_vertex(&self, vertex: VertexId) -> Result<bool, GraphError> {
        Ok(self.by_start.contains_key(&vertex) || self.by_end.contains_key(&vertex))
    }

    fn rows(&self) -> Result<Vec<ClosureEdge>, GraphError> {
        Ok(self.rows.values().copied().collect())
    }

    fn clear(&mut self) -> Result<(), GraphError> {
        // Keep the allocator so cleared ids are never handed out again.
        let ids = std::mem::take(&mut self.ids);
        *self = Self {
            ids,
            ..Self::default()
        };
        Ok(())
    }

    fn replace_edges(&mut self, edges: &[DirectEdge]) -> Result<(), GraphError> {
        let mut fresh = Self {
            ids: self.ids.clone(),
            ..Self::default()
        };
        for edge in edges {
            fresh.add_edge(edge.parent, edge.child)?;
        }
        *self = fresh;
        Ok(())
    }
}
