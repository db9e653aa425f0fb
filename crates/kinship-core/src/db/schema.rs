//! SQLite schema for the closure table.
//!
//! A single relation, `group_graph`, keyed by a synthetic row id:
//! - `start_vertex`, `end_vertex`, `hops` describe the path
//! - `entry_edge_id`, `direct_edge_id`, `exit_edge_id` record provenance
//! - `graph_meta` tracks the schema version and the count of committed mutations

/// Migration v1: closure table plus metadata row.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS group_graph (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_edge_id INTEGER,
    direct_edge_id INTEGER,
    exit_edge_id INTEGER,
    start_vertex INTEGER NOT NULL,
    end_vertex INTEGER NOT NULL,
    hops INTEGER NOT NULL CHECK (hops >= 0),
    CHECK (start_vertex <> end_vertex)
);

CREATE TABLE IF NOT EXISTS graph_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    mutation_count INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO graph_meta (
    id,
    schema_version,
    mutation_count
) VALUES (1, 1, 0);
";

/// Migration v2: lookup indexes and the one-direct-row-per-pair constraint.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_group_graph_start
    ON group_graph(start_vertex, end_vertex);

CREATE INDEX IF NOT EXISTS idx_group_graph_end
    ON group_graph(end_vertex, start_vertex);

CREATE INDEX IF NOT EXISTS idx_group_graph_direct
    ON group_graph(direct_edge_id);

CREATE INDEX IF NOT EXISTS idx_group_graph_entry
    ON group_graph(entry_edge_id);

CREATE INDEX IF NOT EXISTS idx_group_graph_exit
    ON group_graph(exit_edge_id);

CREATE UNIQUE INDEX IF NOT EXISTS idx_group_graph_direct_pair
    ON group_graph(start_vertex, end_vertex)
    WHERE hops = 0;

UPDATE graph_meta
SET schema_version = 2
WHERE id = 1;
";

/// Indexes the store's read and retraction paths rely on.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_group_graph_start",
    "idx_group_graph_end",
    "idx_group_graph_direct",
    "idx_group_graph_entry",
    "idx_group_graph_exit",
    "idx_group_graph_direct_pair",
];
