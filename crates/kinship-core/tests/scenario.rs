//! End-to-end hierarchy scenarios run against both backends.

use kinship_core::audit::audit;
use kinship_core::rebuild::rebuild;
use kinship_core::{
    ClosureStore, GraphError, GroupHierarchy, MemoryClosureStore, SqliteClosureStore, VertexId,
};

fn v(raw: i64) -> VertexId {
    VertexId::new(raw)
}

fn vs(raw: &[i64]) -> Vec<VertexId> {
    raw.iter().copied().map(VertexId::new).collect()
}

fn backends() -> Vec<(&'static str, Box<dyn ClosureStore>)> {
    let memory: Box<dyn ClosureStore> = Box::new(MemoryClosureStore::new());
    let sqlite: Box<dyn ClosureStore> =
        Box::new(SqliteClosureStore::open_in_memory().expect("open sqlite store"));
    vec![("memory", memory), ("sqlite", sqlite)]
}

#[test]
fn chain_add_query_remove() {
    for (name, mut store) in backends() {
        store.add_edge(v(1), v(2)).expect("1 -> 2");
        store.add_edge(v(2), v(3)).expect("2 -> 3");
        store.add_edge(v(1), v(4)).expect("1 -> 4");

        assert_eq!(store.descendants(v(1)).expect("q"), vs(&[2, 3, 4]), "{name}");
        assert_eq!(store.ancestors(v(3)).expect("q"), vs(&[1, 2]), "{name}");
        assert!(store.is_ancestor(v(1), v(3)).expect("q"), "{name}");
        assert!(store.is_descendant(v(3), v(1)).expect("q"), "{name}");

        store.remove_edge(v(1), v(2)).expect("remove");
        assert_eq!(store.descendants(v(1)).expect("q"), vs(&[4]), "{name}");
        assert_eq!(store.ancestors(v(3)).expect("q"), vs(&[2]), "{name}");
        assert!(!store.is_ancestor(v(1), v(3)).expect("q"), "{name}");
        assert!(audit(&*store).expect("audit").is_ok(), "{name}");
    }
}

#[test]
fn cycles_are_rejected_without_side_effects() {
    for (name, mut store) in backends() {
        store.add_edge(v(1), v(2)).expect("1 -> 2");
        store.add_edge(v(2), v(3)).expect("2 -> 3");
        let before = store.rows().expect("rows");

        for (parent, child) in [(3, 1), (2, 1), (3, 3)] {
            let err = store
                .add_edge(v(parent), v(child))
                .expect_err("cycle must be rejected");
            assert!(
                matches!(err, GraphError::Cycle { parent: p, child: c } if p == v(parent) && c == v(child)),
                "{name}: {err}"
            );
        }
        assert_eq!(store.rows().expect("rows"), before, "{name}");
    }
}

#[test]
fn cycle_error_names_both_groups() {
    let mut store = MemoryClosureStore::new();
    store.add_edge(v(10), v(20)).expect("seed");
    let err = store.add_edge(v(20), v(10)).expect_err("cycle");
    assert_eq!(
        err.to_string(),
        "cannot add group 10 as a subgroup of group 20: group 20 is already a descendant of group 10"
    );
    assert_eq!(err.code().code(), "E2001");
}

#[test]
fn diamond_survives_loss_of_one_branch() {
    for (name, mut store) in backends() {
        for (p, c) in [(1, 2), (1, 3), (2, 4), (3, 4), (4, 5)] {
            store.add_edge(v(p), v(c)).expect("diamond edge");
        }
        store.remove_edge(v(1), v(2)).expect("remove branch");
        assert!(store.is_ancestor(v(1), v(5)).expect("q"), "{name}");
        assert_eq!(store.ancestors(v(5)).expect("q"), vs(&[1, 2, 3, 4]), "{name}");

        store.remove_edge(v(3), v(4)).expect("remove other branch");
        assert!(!store.is_ancestor(v(1), v(5)).expect("q"), "{name}");
        assert_eq!(store.ancestors(v(5)).expect("q"), vs(&[2, 4]), "{name}");
        assert!(audit(&*store).expect("audit").is_ok(), "{name}");
    }
}

#[test]
fn deep_bridge_is_fully_retracted() {
    // Two chains 0 -> 1 -> 2 and 3 -> 4 -> 5 joined by 2 -> 3 before the
    // outer links exist, so the outer rows derive from bridging rows.
    for (name, mut store) in backends() {
        for (p, c) in [(1, 2), (3, 4), (2, 3), (4, 5), (0, 1)] {
            store.add_edge(v(p), v(c)).expect("edge");
        }
        assert_eq!(store.descendants(v(0)).expect("q"), vs(&[1, 2, 3, 4, 5]), "{name}");

        store.remove_edge(v(2), v(3)).expect("remove bridge");
        assert_eq!(store.descendants(v(0)).expect("q"), vs(&[1, 2]), "{name}");
        assert_eq!(store.ancestors(v(5)).expect("q"), vs(&[3, 4]), "{name}");
        assert_eq!(store.rows().expect("rows").len(), 6, "{name}");
    }
}

#[test]
fn re_adding_a_removed_edge_restores_reachability() {
    for (name, mut store) in backends() {
        for (p, c) in [(1, 2), (2, 3), (3, 4)] {
            store.add_edge(v(p), v(c)).expect("edge");
        }
        let first = store.direct_edge_id(v(2), v(3)).expect("q").expect("edge exists");
        store.remove_edge(v(2), v(3)).expect("remove");
        let second = store.add_edge(v(2), v(3)).expect("re-add");

        assert!(second > first, "{name}: ids must not be reused");
        assert_eq!(store.descendants(v(1)).expect("q"), vs(&[2, 3, 4]), "{name}");
        assert_eq!(store.rows().expect("rows").len(), 6, "{name}");
    }
}

#[test]
fn rebuild_leaves_answers_unchanged() {
    for (name, mut store) in backends() {
        for (p, c) in [(1, 2), (2, 3), (1, 3), (3, 4), (5, 1)] {
            store.add_edge(v(p), v(c)).expect("edge");
        }
        let before: Vec<_> = (1..=5)
            .map(|i| store.descendants(v(i)).expect("q"))
            .collect();

        let report = rebuild(&mut *store).expect("rebuild");
        assert_eq!(report.direct_edges, 5, "{name}");
        assert_eq!(report.rows_before, report.rows_after, "{name}");

        let after: Vec<_> = (1..=5)
            .map(|i| store.descendants(v(i)).expect("q"))
            .collect();
        assert_eq!(before, after, "{name}");
    }
}

#[test]
fn hierarchy_facade_over_sqlite() {
    let store = SqliteClosureStore::open_in_memory().expect("open");
    let mut hierarchy = GroupHierarchy::new(store);
    hierarchy.add_subgroup(v(1), v(2)).expect("add");
    hierarchy.add_subgroup(v(2), v(3)).expect("add");

    assert!(hierarchy.group_has_subgroup(v(1), v(3)).expect("q"));
    assert_eq!(hierarchy.direct_subgroup_ids(v(1)).expect("q"), vs(&[2]));
    assert!(matches!(
        hierarchy.checked_supergroup_ids(v(42)),
        Err(GraphError::UnknownVertex(_))
    ));

    hierarchy.remove_subgroup(v(1), v(2)).expect("remove");
    assert!(!hierarchy.group_has_subgroup(v(1), v(3)).expect("q"));
}
