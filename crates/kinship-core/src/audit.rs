//! Consistency audit of a closure table.
//!
//! The audit trusts only the direct rows. From them it recomputes how many
//! distinct paths join every pair of groups (a DAG path count in topological
//! order) and compares that with the rows actually stored, then checks each
//! row's provenance against the rows it names.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Instant;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use serde::Serialize;
use tracing::{info, warn};

use crate::closure::ClosureStore;
use crate::error::GraphError;
use crate::model::{ClosureEdge, EdgeId, VertexId};

/// One inconsistency found by [`audit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// More than one direct row joins the same pair.
    DuplicateDirect {
        parent: VertexId,
        child: VertexId,
        ids: Vec<EdgeId>,
    },
    /// A row starts and ends at the same group.
    SelfLoop { id: EdgeId, vertex: VertexId },
    /// A row names a provenance row that does not exist.
    DanglingProvenance { id: EdgeId, missing: EdgeId },
    /// A direct row whose entry, exit, or direct id is not its own id.
    DirectNotSelfReferential { id: EdgeId },
    /// A derived row whose `direct_edge_id` names a derived row.
    DirectIdNotDirect { id: EdgeId, direct_edge_id: EdgeId },
    /// A derived row whose endpoints or hops do not compose from its
    /// provenance rows.
    BadComposition { id: EdgeId, reason: String },
    /// The direct edges contain a cycle through `vertex`.
    DirectCycle { vertex: VertexId },
    /// Stored rows for a pair differ from the number of paths between it.
    PathCountMismatch {
        start: VertexId,
        end: VertexId,
        expected: usize,
        actual: usize,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateDirect { parent, child, ids } => {
                write!(f, "{} direct rows for {parent} -> {child}", ids.len())
            }
            Self::SelfLoop { id, vertex } => write!(f, "row {id} loops on group {vertex}"),
            Self::DanglingProvenance { id, missing } => {
                write!(f, "row {id} references missing row {missing}")
            }
            Self::DirectNotSelfReferential { id } => {
                write!(f, "direct row {id} has foreign provenance")
            }
            Self::DirectIdNotDirect { id, direct_edge_id } => {
                write!(f, "row {id} names {direct_edge_id} as its direct edge, which is derived")
            }
            Self::BadComposition { id, reason } => write!(f, "row {id}: {reason}"),
            Self::DirectCycle { vertex } => {
                write!(f, "direct edges form a cycle through group {vertex}")
            }
            Self::PathCountMismatch {
                start,
                end,
                expected,
                actual,
            } => write!(
                f,
                "{start} -> {end}: {expected} path(s) but {actual} row(s)"
            ),
        }
    }
}

/// Result of [`audit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    /// Rows inspected.
    pub rows: usize,
    /// Direct rows among them.
    pub direct_edges: usize,
    /// Distinct `(start, end)` pairs with at least one row.
    pub reachable_pairs: usize,
    pub violations: Vec<Violation>,
}

impl AuditReport {
    /// Return `true` when no violation was found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Audit every row of `store`.
///
/// # Errors
///
/// Backend failures while reading the rows.
pub fn audit<S: ClosureStore + ?Sized>(store: &S) -> Result<AuditReport, GraphError> {
    let started = Instant::now();
    let rows = store.rows()?;
    let by_id: HashMap<EdgeId, &ClosureEdge> = rows.iter().map(|row| (row.id, row)).collect();

    let mut violations = Vec::new();
    check_direct_rows(&rows, &mut violations);
    for row in &rows {
        check_row(row, &by_id, &mut violations);
    }

    let mut actual: BTreeMap<(VertexId, VertexId), usize> = BTreeMap::new();
    for row in &rows {
        *actual.entry((row.start, row.end)).or_default() += 1;
    }
    let reachable_pairs = actual.len();

    let graph: DiGraphMap<VertexId, ()> = rows
        .iter()
        .filter(|row| row.is_direct() && row.start != row.end)
        .map(|row| (row.start, row.end))
        .collect();

    match path_counts(&graph) {
        Ok(expected) => compare_counts(&expected, &actual, &mut violations),
        Err(vertex) => violations.push(Violation::DirectCycle { vertex }),
    }

    let report = AuditReport {
        rows: rows.len(),
        direct_edges: rows.iter().filter(|row| row.is_direct()).count(),
        reachable_pairs,
        violations,
    };

    for violation in &report.violations {
        warn!(%violation, "closure audit violation");
    }
    info!(
        rows = report.rows,
        direct_edges = report.direct_edges,
        violations = report.violations.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "closure audit complete"
    );

    Ok(report)
}

fn check_direct_rows(rows: &[ClosureEdge], violations: &mut Vec<Violation>) {
    let mut direct: BTreeMap<(VertexId, VertexId), Vec<EdgeId>> = BTreeMap::new();
    for row in rows.iter().filter(|row| row.is_direct()) {
        direct.entry((row.start, row.end)).or_default().push(row.id);
    }
    for ((parent, child), ids) in direct {
        if ids.len() > 1 {
            violations.push(Violation::DuplicateDirect { parent, child, ids });
        }
    }
}

fn check_row(
    row: &ClosureEdge,
    by_id: &HashMap<EdgeId, &ClosureEdge>,
    violations: &mut Vec<Violation>,
) {
    if row.start == row.end {
        violations.push(Violation::SelfLoop {
            id: row.id,
            vertex: row.start,
        });
    }

    if row.is_direct() {
        if row.entry_edge_id != row.id || row.exit_edge_id != row.id || row.direct_edge_id != row.id
        {
            violations.push(Violation::DirectNotSelfReferential { id: row.id });
        }
        return;
    }

    let mut resolved = [None; 3];
    for (slot, reference) in [row.direct_edge_id, row.entry_edge_id, row.exit_edge_id]
        .into_iter()
        .enumerate()
    {
        match by_id.get(&reference) {
            Some(target) => resolved[slot] = Some(*target),
            None => violations.push(Violation::DanglingProvenance {
                id: row.id,
                missing: reference,
            }),
        }
    }
    let [Some(direct), Some(entry), Some(exit)] = resolved else {
        return;
    };

    if !direct.is_direct() {
        violations.push(Violation::DirectIdNotDirect {
            id: row.id,
            direct_edge_id: direct.id,
        });
        return;
    }

    if let Some(reason) = composition_error(row, direct, entry, exit) {
        violations.push(Violation::BadComposition { id: row.id, reason });
    }
}

fn composition_error(
    row: &ClosureEdge,
    direct: &ClosureEdge,
    entry: &ClosureEdge,
    exit: &ClosureEdge,
) -> Option<String> {
    let has_prefix = entry.id != direct.id;
    let has_suffix = exit.id != direct.id;

    if !has_prefix && !has_suffix {
        return Some("derived row with neither prefix nor suffix".to_string());
    }
    if has_prefix && (entry.end != direct.start || entry.start != row.start) {
        return Some(format!("entry row {} does not lead into {}", entry.id, direct.start));
    }
    if !has_prefix && row.start != direct.start {
        return Some(format!("start {} differs from direct start {}", row.start, direct.start));
    }
    if has_suffix && (exit.start != direct.end || exit.end != row.end) {
        return Some(format!("exit row {} does not lead out of {}", exit.id, direct.end));
    }
    if !has_suffix && row.end != direct.end {
        return Some(format!("end {} differs from direct end {}", row.end, direct.end));
    }

    let expected = 1
        + if has_prefix { entry.hops } else { 0 }
        + if has_suffix { exit.hops } else { 0 };
    (row.hops != expected).then(|| format!("hops {} but provenance implies {expected}", row.hops))
}

/// Paths between every ordered pair of distinct vertices, or a vertex on a
/// cycle.
fn path_counts(
    graph: &DiGraphMap<VertexId, ()>,
) -> Result<HashMap<(VertexId, VertexId), usize>, VertexId> {
    let order = toposort(graph, None).map_err(|cycle| cycle.node_id())?;

    let mut counts = HashMap::new();
    for (i, &source) in order.iter().enumerate() {
        let mut from_source: HashMap<VertexId, usize> = HashMap::new();
        from_source.insert(source, 1);
        for &v in &order[i..] {
            let Some(&reaching) = from_source.get(&v) else {
                continue;
            };
            for next in graph.neighbors_directed(v, Direction::Outgoing) {
                *from_source.entry(next).or_default() += reaching;
            }
        }
        for (target, paths) in from_source {
            if target != source {
                counts.insert((source, target), paths);
            }
        }
    }
    Ok(counts)
}

fn compare_counts(
    expected: &HashMap<(VertexId, VertexId), usize>,
    actual: &BTreeMap<(VertexId, VertexId), usize>,
    violations: &mut Vec<Violation>,
) {
    let mut pairs: Vec<(VertexId, VertexId)> =
        expected.keys().chain(actual.keys()).copied().collect();
    pairs.sort_unstable();
    pairs.dedup();

    for (start, end) in pairs {
        let want = expected.get(&(start, end)).copied().unwrap_or(0);
        let have = actual.get(&(start, end)).copied().unwrap_or(0);
        if want != have && start != end {
            violations.push(Violation::PathCountMismatch {
                start,
                end,
                expected: want,
                actual: have,
            });
        }
    }
}
