//! Re-deriving the closure from its direct edges, and bulk edge import.
//!
//! Direct edges are the only facts a caller ever asserts; every derived row
//! is reproducible from them. `rebuild` proves it by throwing the derived
//! rows away and replaying the direct edges in their original order.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::closure::ClosureStore;
use crate::error::GraphError;
use crate::model::DirectEdge;

/// Version stamped into exported edge documents.
pub const EDGE_DOCUMENT_VERSION: u32 = 1;

/// Report returned after [`rebuild`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildReport {
    /// Direct edges replayed.
    pub direct_edges: usize,
    /// Rows before the rebuild.
    pub rows_before: usize,
    /// Rows after the rebuild.
    pub rows_after: usize,
    pub elapsed: Duration,
}

/// Report returned after [`import_edges`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ImportReport {
    /// Edges that created a new direct row.
    pub added: usize,
    /// Edges that were already present.
    pub existing: usize,
}

/// Portable list of direct edges, as produced by `kin export`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDocument {
    pub version: u32,
    pub edges: Vec<DirectEdge>,
}

impl EdgeDocument {
    /// Snapshot the direct edges of `store`.
    ///
    /// # Errors
    ///
    /// Backend failure.
    pub fn from_store<S: ClosureStore + ?Sized>(store: &S) -> Result<Self, GraphError> {
        Ok(Self {
            version: EDGE_DOCUMENT_VERSION,
            edges: store.direct_edges()?,
        })
    }

    /// Parse a JSON edge document.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON or an unsupported version.
    pub fn parse(json: &str) -> Result<Self> {
        let document: Self = serde_json::from_str(json).context("parse edge document")?;
        anyhow::ensure!(
            document.version == EDGE_DOCUMENT_VERSION,
            "unsupported edge document version {} (expected {EDGE_DOCUMENT_VERSION})",
            document.version
        );
        Ok(document)
    }
}

/// Discard every row of `store` and re-derive the closure from its direct
/// edges, replayed in id order.
///
/// # Errors
///
/// [`GraphError::Cycle`] if the stored direct edges are themselves cyclic
/// (the store is left as it was); backend failure.
pub fn rebuild<S: ClosureStore + ?Sized>(store: &mut S) -> Result<RebuildReport, GraphError> {
    let start = Instant::now();

    let rows_before = store.rows()?.len();
    let edges = store.direct_edges()?;
    store.replace_edges(&edges)?;
    let rows_after = store.rows()?.len();

    let elapsed = start.elapsed();
    info!(
        direct_edges = edges.len(),
        rows_before,
        rows_after,
        elapsed_ms = elapsed.as_millis(),
        "closure rebuild complete"
    );

    Ok(RebuildReport {
        direct_edges: edges.len(),
        rows_before,
        rows_after,
        elapsed,
    })
}

/// Add `edges` in order, stopping at the first error. Edges added before the
/// failing one stay in place.
///
/// # Errors
///
/// The first [`GraphError`] raised by [`ClosureStore::add_edge`].
pub fn import_edges<S: ClosureStore + ?Sized>(
    store: &mut S,
    edges: &[DirectEdge],
) -> Result<ImportReport, GraphError> {
    let start = Instant::now();
    let mut report = ImportReport::default();

    for edge in edges {
        let existed = store.direct_edge_id(edge.parent, edge.child)?.is_some();
        store.add_edge(edge.parent, edge.child)?;
        if existed {
            report.existing += 1;
        } else {
            report.added += 1;
        }
    }

    info!(
        added = report.added,
        existing = report.existing,
        elapsed_ms = start.elapsed().as_millis(),
        "edge import complete"
    );
    Ok(report)
}
