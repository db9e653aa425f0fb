//! Closure table persisted in SQLite.
//!
//! Every mutation runs inside a `BEGIN IMMEDIATE` transaction: the write
//! lock is taken before the admission check reads anything, so two writers
//! can never plan rows from the same snapshot, and WAL readers see either
//! the whole mutation or none of it. Any error drops the transaction, which
//! rolls it back.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use tracing::{debug, info};

use crate::closure::derive::derive_rows;
use crate::closure::guard::{self, Admission, Reachability};
use crate::closure::retract::collect_retraction;
use crate::closure::ClosureStore;
use crate::error::GraphError;
use crate::model::{ClosureEdge, DerivedRow, DirectEdge, EdgeId, VertexId};

const ROW_COLUMNS: &str =
    "id, start_vertex, end_vertex, hops, entry_edge_id, exit_edge_id, direct_edge_id";

/// A [`ClosureStore`] backed by the `group_graph` table.
#[derive(Debug)]
pub struct SqliteClosureStore {
    conn: Connection,
}

impl SqliteClosureStore {
    /// Wrap a connection whose schema is already migrated.
    #[must_use]
    pub const fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open (or create) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        super::open_graph_db(path, busy_timeout).map(Self::from_connection)
    }

    /// Open a private in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        super::open_in_memory().map(Self::from_connection)
    }

    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Number of committed `add_edge`/`remove_edge`/`clear` calls that changed
    /// the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata row cannot be read.
    pub fn mutation_count(&self) -> Result<u64, GraphError> {
        let count: i64 = self.conn.query_row(
            "SELECT mutation_count FROM graph_meta WHERE id = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

struct SqlReader<'c>(&'c Connection);

impl Reachability for SqlReader<'_> {
    fn direct_edge(&self, parent: VertexId, child: VertexId) -> Result<Option<EdgeId>, GraphError> {
        Ok(direct_edge_id(self.0, parent, child)?)
    }

    fn reaches(&self, from: VertexId, to: VertexId) -> Result<bool, GraphError> {
        Ok(reaches(self.0, from, to)?)
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<ClosureEdge> {
    Ok(ClosureEdge {
        id: row.get(0)?,
        start: row.get(1)?,
        end: row.get(2)?,
        hops: row.get(3)?,
        entry_edge_id: row.get(4)?,
        exit_edge_id: row.get(5)?,
        direct_edge_id: row.get(6)?,
    })
}

fn select_rows(
    conn: &Connection,
    filter: &str,
    vertex: VertexId,
) -> rusqlite::Result<Vec<ClosureEdge>> {
    let sql = format!("SELECT {ROW_COLUMNS} FROM group_graph WHERE {filter} = ?1 ORDER BY id");
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map([vertex], read_row)?;
    rows.collect()
}

fn select_vertices(conn: &Connection, sql: &str, vertex: VertexId) -> rusqlite::Result<Vec<VertexId>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map([vertex], |row| row.get(0))?;
    rows.collect()
}

fn direct_edge_id(
    conn: &Connection,
    parent: VertexId,
    child: VertexId,
) -> rusqlite::Result<Option<EdgeId>> {
    conn.query_row(
        "SELECT id FROM group_graph
         WHERE start_vertex = ?1 AND end_vertex = ?2 AND hops = 0",
        params![parent, child],
        |row| row.get(0),
    )
    .optional()
}

fn reaches(conn: &Connection, from: VertexId, to: VertexId) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM group_graph WHERE start_vertex = ?1 AND end_vertex = ?2
        )",
        params![from, to],
        |row| row.get(0),
    )
}

fn insert_direct(conn: &Connection, parent: VertexId, child: VertexId) -> rusqlite::Result<ClosureEdge> {
    conn.execute(
        "INSERT INTO group_graph (start_vertex, end_vertex, hops) VALUES (?1, ?2, 0)",
        params![parent, child],
    )?;
    let id = EdgeId::new(conn.last_insert_rowid());
    conn.execute(
        "UPDATE group_graph
         SET entry_edge_id = ?1, exit_edge_id = ?1, direct_edge_id = ?1
         WHERE id = ?1",
        [id],
    )?;
    Ok(ClosureEdge::direct(id, parent, child))
}

fn insert_derived(conn: &Connection, planned: &[DerivedRow]) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO group_graph (
            entry_edge_id, direct_edge_id, exit_edge_id, start_vertex, end_vertex, hops
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for row in planned {
        stmt.execute(params![
            row.entry_edge_id,
            row.direct_edge_id,
            row.exit_edge_id,
            row.start,
            row.end,
            row.hops,
        ])?;
    }
    Ok(())
}

fn bump_mutation_count(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE graph_meta SET mutation_count = mutation_count + 1 WHERE id = 1",
        [],
    )?;
    Ok(())
}

enum Added {
    Existing(EdgeId),
    Inserted { id: EdgeId, derived: usize },
}

/// Admit and write `parent -> child` inside an open transaction.
fn add_in(conn: &Connection, parent: VertexId, child: VertexId) -> Result<Added, GraphError> {
    if let Admission::Existing(id) = guard::admit(&SqlReader(conn), parent, child)? {
        return Ok(Added::Existing(id));
    }

    // Snapshot both sides before the direct row exists.
    let incoming = select_rows(conn, "end_vertex", parent)?;
    let outgoing = select_rows(conn, "start_vertex", child)?;

    let direct = insert_direct(conn, parent, child)?;
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
    insert_derived(conn, &planned)?;

    Ok(Added::Inserted {
        id: direct.id,
        derived: planned.len(),
    })
}

impl ClosureStore for SqliteClosureStore {
    fn add_edge(&mut self, parent: VertexId, child: VertexId) -> Result<EdgeId, GraphError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        match add_in(&tx, parent, child)? {
            Added::Existing(id) => Ok(id),
            Added::Inserted { id, derived } => {
                bump_mutation_count(&tx)?;
                tx.commit()?;
                info!(%parent, %child, edge_id = %id, derived, "added edge");
                Ok(id)
            }
        }
    }

    fn remove_edge(&mut self, parent: VertexId, child: VertexId) -> Result<(), GraphError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(edge_id) = direct_edge_id(&tx, parent, child)? else {
            debug!(%parent, %child, "no direct edge to remove");
            return Ok(());
        };

        let doomed = {
            let mut seed_stmt =
                tx.prepare_cached("SELECT id FROM group_graph WHERE direct_edge_id = ?1")?;
            let seed = seed_stmt
                .query_map([edge_id], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<EdgeId>>>()?;

            let mut referrers = tx.prepare_cached(
                "SELECT id FROM group_graph
                 WHERE hops > 0
                   AND (entry_edge_id = ?1 OR exit_edge_id = ?1)
                   AND id <> ?1",
            )?;
            collect_retraction(seed, |id| {
                referrers
                    .query_map([id], |row| row.get(0))?
                    .collect::<rusqlite::Result<Vec<EdgeId>>>()
            })?
        };

        {
            let mut delete = tx.prepare_cached("DELETE FROM group_graph WHERE id = ?1")?;
            for id in &doomed {
                delete.execute([id])?;
            }
        }
        bump_mutation_count(&tx)?;
        tx.commit()?;

        info!(%parent, %child, edge_id = %edge_id, removed = doomed.len(), "removed edge");
        Ok(())
    }

    fn descendants(&self, vertex: VertexId) -> Result<Vec<VertexId>, GraphError> {
        Ok(select_vertices(
            &self.conn,
            "SELECT DISTINCT end_vertex FROM group_graph
             WHERE start_vertex = ?1 ORDER BY end_vertex",
            vertex,
        )?)
    }

    fn ancestors(&self, vertex: VertexId) -> Result<Vec<VertexId>, GraphError> {
        Ok(select_vertices(
            &self.conn,
            "SELECT DISTINCT start_vertex FROM group_graph
             WHERE end_vertex = ?1 ORDER BY start_vertex",
            vertex,
        )?)
    }

    fn is_descendant(&self, a: VertexId, b: VertexId) -> Result<bool, GraphError> {
        Ok(reaches(&self.conn, b, a)?)
    }

    fn direct_edge_id(
        &self,
        parent: VertexId,
        child: VertexId,
    ) -> Result<Option<EdgeId>, GraphError> {
        Ok(direct_edge_id(&self.conn, parent, child)?)
    }

    fn children(&self, vertex: VertexId) -> Result<Vec<VertexId>, GraphError> {
        Ok(select_vertices(
            &self.conn,
            "SELECT end_vertex FROM group_graph
             WHERE start_vertex = ?1 AND hops = 0 ORDER BY end_vertex",
            vertex,
        )?)
    }

    fn parents(&self, vertex: VertexId) -> Result<Vec<VertexId>, GraphError> {
        Ok(select_vertices(
            &self.conn,
            "SELECT start_vertex FROM group_graph
             WHERE end_vertex = ?1 AND hops = 0 ORDER BY start_vertex",
            vertex,
        )?)
    }

    fn contains_vertex(&self, vertex: VertexId) -> Result<bool, GraphError> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM group_graph WHERE start_vertex = ?1)
                 OR EXISTS(SELECT 1 FROM group_graph WHERE end_vertex = ?1)",
            [vertex],
            |row| row.get(0),
        )?)
    }

    fn rows(&self) -> Result<Vec<ClosureEdge>, GraphError> {
        let sql = format!("SELECT {ROW_COLUMNS} FROM group_graph ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], read_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn clear(&mut self) -> Result<(), GraphError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let removed = tx.execute("DELETE FROM group_graph", [])?;
        bump_mutation_count(&tx)?;
        tx.commit()?;
        info!(removed, "cleared closure table");
        Ok(())
    }

    fn replace_edges(&mut self, edges: &[DirectEdge]) -> Result<(), GraphError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute("DELETE FROM group_graph", [])?;
        for edge in edges {
            add_in(&tx, edge.parent, edge.child)?;
        }
        bump_mutation_count(&tx)?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(raw: i64) -> VertexId {
        VertexId::new(raw)
    }

    fn vs(raw: &[i64]) -> Vec<VertexId> {
        raw.iter().copied().map(VertexId::new).collect()
    }

    fn store_with(edges: &[(i64, i64)]) -> SqliteClosureStore {
        let mut store = SqliteClosureStore::open_in_memory().expect("open store");
        for (parent, child) in edges {
            store
                .add_edge(v(*parent), v(*child))
                .expect("edge should be admitted");
        }
        store
    }

    fn row_count(store: &SqliteClosureStore) -> i64 {
        store
            .connection()
            .query_row("SELECT COUNT(*) FROM group_graph", [], |row| row.get(0))
            .expect("count rows")
    }

    #[test]
    fn scenario_add_then_remove() {
        let mut store = store_with(&[(1, 2), (2, 3), (1, 4)]);
        assert_eq!(store.descendants(v(1)).expect("q"), vs(&[2, 3, 4]));
        assert_eq!(store.ancestors(v(3)).expect("q"), vs(&[1, 2]));
        assert!(store.is_ancestor(v(1), v(3)).expect("q"));

        store.remove_edge(v(1), v(2)).expect("remove");
        assert_eq!(store.descendants(v(1)).expect("q"), vs(&[4]));
        assert_eq!(store.ancestors(v(3)).expect("q"), vs(&[2]));
        assert!(!store.is_ancestor(v(1), v(3)).expect("q"));
    }

    #[test]
    fn direct_rows_reference_themselves() {
        let store = store_with(&[(1, 2)]);
        let rows = store.rows().expect("rows");
        assert_eq!(rows.len(), 1);
        let row = rows[0];
        assert!(row.is_direct());
        assert_eq!(row.entry_edge_id, row.id);
        assert_eq!(row.exit_edge_id, row.id);
        assert_eq!(row.direct_edge_id, row.id);
    }

    #[test]
    fn add_is_idempotent() {
        let mut store = store_with(&[(1, 2), (2, 3)]);
        let first = store.direct_edge_id(v(1), v(2)).expect("q");
        let again = store.add_edge(v(1), v(2)).expect("idempotent add");
        assert_eq!(Some(again), first);
        assert_eq!(row_count(&store), 3);
    }

    #[test]
    fn cycle_is_rejected_and_rolled_back() {
        let mut store = store_with(&[(1, 2), (2, 3)]);
        let before = store.rows().expect("rows");
        let mutations = store.mutation_count().expect("count");

        let err = store.add_edge(v(3), v(1));
        assert!(matches!(err, Err(GraphError::Cycle { .. })));
        assert_eq!(store.rows().expect("rows"), before);
        assert_eq!(store.mutation_count().expect("count"), mutations);
    }

    #[test]
    fn deep_derivations_are_retracted() {
        let mut store = store_with(&[(1, 2), (3, 4), (2, 3), (4, 5), (0, 1)]);
        assert_eq!(row_count(&store), 15);
        store.remove_edge(v(2), v(3)).expect("remove");
        assert_eq!(row_count(&store), 6);
        assert!(!store.is_ancestor(v(0), v(5)).expect("q"));
        assert!(store.is_ancestor(v(0), v(2)).expect("q"));
    }

    #[test]
    fn direct_neighbours_ignore_derived_rows() {
        let store = store_with(&[(1, 2), (2, 3), (1, 3), (4, 3)]);
        assert_eq!(store.children(v(1)).expect("q"), vs(&[2, 3]));
        assert_eq!(store.parents(v(3)).expect("q"), vs(&[1, 2, 4]));
        assert_eq!(store.ancestors(v(3)).expect("q"), vs(&[1, 2, 4]));
    }

    #[test]
    fn contains_vertex_sees_both_ends() {
        let store = store_with(&[(1, 2)]);
        assert!(store.contains_vertex(v(1)).expect("q"));
        assert!(store.contains_vertex(v(2)).expect("q"));
        assert!(!store.contains_vertex(v(3)).expect("q"));
    }

    #[test]
    fn clear_does_not_recycle_ids() {
        let mut store = store_with(&[(1, 2), (2, 3)]);
        store.clear().expect("clear");
        assert_eq!(row_count(&store), 0);
        let id = store.add_edge(v(1), v(2)).expect("add after clear");
        assert_eq!(id, EdgeId::new(4));
    }

    #[test]
    fn replace_edges_rolls_back_on_cycle() {
        let mut store = store_with(&[(1, 2), (2, 3)]);
        let before = store.rows().expect("rows");
        let cyclic = [
            DirectEdge::new(v(5), v(6)),
            DirectEdge::new(v(6), v(5)),
        ];
        let err = store.replace_edges(&cyclic);
        assert!(err.is_err_and(|e| e.is_cycle()));
        assert_eq!(store.rows().expect("rows"), before);
    }

    #[test]
    fn replace_edges_rederives_the_closure() {
        let mut store = store_with(&[(1, 2), (2, 3)]);
        let edges = store.direct_edges().expect("direct");
        store.replace_edges(&edges).expect("replace");
        assert_eq!(row_count(&store), 3);
        assert_eq!(store.descendants(v(1)).expect("q"), vs(&[2, 3]));
        assert!(store.rows().expect("rows").iter().all(|row| row.id.get() > 3));
    }

    #[test]
    fn removing_missing_edge_leaves_metadata_alone() {
        let mut store = store_with(&[(1, 2)]);
        let mutations = store.mutation_count().expect("count");
        store.remove_edge(v(2), v(1)).expect("noop");
        assert_eq!(store.mutation_count().expect("count"), mutations);
    }
}
