//! Group-centric vocabulary over a closure store.
//!
//! `GroupHierarchy` speaks in subgroups and supergroups and forwards to the
//! underlying [`ClosureStore`]. The `checked_*` variants first confirm the
//! group takes part in some hierarchy and fail with
//! [`GraphError::UnknownVertex`] otherwise; the plain variants treat an
//! unknown group as one with no relatives.

use crate::closure::ClosureStore;
use crate::error::GraphError;
use crate::model::{EdgeId, VertexId};

#[derive(Debug, Default)]
pub struct GroupHierarchy<S> {
    store: S,
}

impl<S: ClosureStore> GroupHierarchy<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Make `subgroup` a direct subgroup of `group`.
    ///
    /// # Errors
    ///
    /// [`GraphError::Cycle`] when `group` already sits below `subgroup`.
    pub fn add_subgroup(&mut self, group: VertexId, subgroup: VertexId) -> Result<EdgeId, GraphError> {
        self.store.add_edge(group, subgroup)
    }

    /// # Errors
    ///
    /// Backend failure.
    pub fn remove_subgroup(&mut self, group: VertexId, subgroup: VertexId) -> Result<(), GraphError> {
        self.store.remove_edge(group, subgroup)
    }

    /// `true` when `subgroup` sits anywhere below `group`.
    ///
    /// # Errors
    ///
    /// Backend failure.
    pub fn group_has_subgroup(&self, group: VertexId, subgroup: VertexId) -> Result<bool, GraphError> {
        self.store.is_descendant(subgroup, group)
    }

    /// # Errors
    ///
    /// Backend failure.
    pub fn subgroup_ids(&self, group: VertexId) -> Result<Vec<VertexId>, GraphError> {
        self.store.descendants(group)
    }

    /// # Errors
    ///
    /// Backend failure.
    pub fn supergroup_ids(&self, group: VertexId) -> Result<Vec<VertexId>, GraphError> {
        self.store.ancestors(group)
    }

    /// # Errors
    ///
    /// Backend failure.
    pub fn direct_subgroup_ids(&self, group: VertexId) -> Result<Vec<VertexId>, GraphError> {
        self.store.children(group)
    }

    /// # Errors
    ///
    /// Backend failure.
    pub fn direct_supergroup_ids(&self, group: VertexId) -> Result<Vec<VertexId>, GraphError> {
        self.store.parents(group)
    }

    /// # Errors
    ///
    /// [`GraphError::UnknownVertex`] when no row mentions `group`.
    pub fn require_group(&self, group: VertexId) -> Result<(), GraphError> {
        if self.store.contains_vertex(group)? {
            Ok(())
        } else {
            Err(GraphError::UnknownVertex(group))
        }
    }

    /// # Errors
    ///
    /// [`GraphError::UnknownVertex`] or backend failure.
    pub fn checked_subgroup_ids(&self, group: VertexId) -> Result<Vec<VertexId>, GraphError> {
        self.require_group(group)?;
        self.subgroup_ids(group)
    }

    /// # Errors
    ///
    /// [`GraphError::UnknownVertex`] or backend failure.
    pub fn checked_supergroup_ids(&self, group: VertexId) -> Result<Vec<VertexId>, GraphError> {
        self.require_group(group)?;
        self.supergroup_ids(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::MemoryClosureStore;

    fn v(raw: i64) -> VertexId {
        VertexId::new(raw)
    }

    fn org() -> GroupHierarchy<MemoryClosureStore> {
        // company -> {engineering, sales}; engineering -> platform
        let mut hierarchy = GroupHierarchy::new(MemoryClosureStore::new());
        hierarchy.add_subgroup(v(1), v(2)).expect("engineering");
        hierarchy.add_subgroup(v(1), v(3)).expect("sales");
        hierarchy.add_subgroup(v(2), v(4)).expect("platform");
        hierarchy
    }

    #[test]
    fn subgroup_relation_reads_top_down() {
        let hierarchy = org();
        assert!(hierarchy.group_has_subgroup(v(1), v(4)).expect("query"));
        assert!(!hierarchy.group_has_subgroup(v(4), v(1)).expect("query"));
        assert!(!hierarchy.group_has_subgroup(v(3), v(4)).expect("query"));
    }

    #[test]
    fn transitive_and_direct_listings() {
        let hierarchy = org();
        assert_eq!(hierarchy.subgroup_ids(v(1)).expect("q"), vec![v(2), v(3), v(4)]);
        assert_eq!(hierarchy.direct_subgroup_ids(v(1)).expect("q"), vec![v(2), v(3)]);
        assert_eq!(hierarchy.supergroup_ids(v(4)).expect("q"), vec![v(1), v(2)]);
        assert_eq!(hierarchy.direct_supergroup_ids(v(4)).expect("q"), vec![v(2)]);
    }

    #[test]
    fn cyclic_subgroup_is_rejected() {
        let mut hierarchy = org();
        let err = hierarchy.add_subgroup(v(4), v(1));
        assert!(err.is_err_and(|e| e.is_cycle()));
    }

    #[test]
    fn removing_a_subgroup_detaches_its_subtree() {
        let mut hierarchy = org();
        hierarchy.remove_subgroup(v(1), v(2)).expect("remove");
        assert_eq!(hierarchy.subgroup_ids(v(1)).expect("q"), vec![v(3)]);
        assert_eq!(hierarchy.supergroup_ids(v(4)).expect("q"), vec![v(2)]);
    }

    #[test]
    fn unknown_group_is_empty_unless_checked() {
        let hierarchy = org();
        assert!(hierarchy.subgroup_ids(v(99)).expect("q").is_empty());
        assert!(matches!(
            hierarchy.checked_subgroup_ids(v(99)),
            Err(GraphError::UnknownVertex(id)) if id == v(99)
        ));
        assert!(matches!(
            hierarchy.checked_supergroup_ids(v(99)),
            Err(GraphError::UnknownVertex(_))
        ));
        assert_eq!(hierarchy.checked_supergroup_ids(v(4)).expect("q"), vec![v(1), v(2)]);
    }

    #[test]
    fn leaf_groups_are_known() {
        let hierarchy = org();
        hierarchy.require_group(v(4)).expect("platform is part of the tree");
        assert!(hierarchy.checked_subgroup_ids(v(4)).expect("q").is_empty());
    }
}
