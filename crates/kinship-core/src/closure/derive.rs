//! Planning the rows implied by a new direct edge.
//!
//! Given the direct row `parent -> child` and a snapshot of the rows that
//! already end at `parent` (`incoming`) and start at `child` (`outgoing`),
//! the new paths are exactly the ones that use the new edge once:
//!
//! | prefix   | suffix   | new row                                  |
//! |----------|----------|------------------------------------------|
//! | incoming | -        | `a.start -> child`, `hops = a.hops + 1`  |
//! | -        | outgoing | `parent -> b.end`, `hops = b.hops + 1`   |
//! | incoming | outgoing | `a.start -> b.end`, `hops = a + b + 1`   |
//!
//! The closure was complete before the edge arrived, so nothing else is
//! needed. The snapshot must be read before any planned row is written.

use crate::model::{ClosureEdge, DerivedRow};

/// Plan the derived rows for `direct`.
///
/// `direct` must be a direct row (`hops == 0`). The returned rows are in a
/// deterministic order: prefix-only, then suffix-only, then bridging rows.
#[must_use]
pub fn derive_rows(
    direct: &ClosureEdge,
    incoming: &[ClosureEdge],
    outgoing: &[ClosureEdge],
) -> Vec<DerivedRow> {
    debug_assert!(direct.is_direct(), "derive_rows needs a direct row");
    debug_assert!(incoming.iter().all(|row| row.end == direct.start));
    debug_assert!(outgoing.iter().all(|row| row.start == direct.end));

    let mut planned =
        Vec::with_capacity(incoming.len() + outgoing.len() + incoming.len() * outgoing.len());

    for a in incoming {
        planned.push(DerivedRow {
            start: a.start,
            end: direct.end,
            hops: a.hops + 1,
            entry_edge_id: a.id,
            exit_edge_id: direct.id,
            direct_edge_id: direct.id,
        });
    }

    for b in outgoing {
        planned.push(DerivedRow {
            start: direct.start,
            end: b.end,
            hops: b.hops + 1,
            entry_edge_id: direct.id,
            exit_edge_id: b.id,
            direct_edge_id: direct.id,
        });
    }

    for a in incoming {
        for b in outgoing {
            planned.push(DerivedRow {
                start: a.start,
                end: b.end,
                hops: a.hops + b.hops + 1,
                entry_edge_id: a.id,
                exit_edge_id: b.id,
                direct_edge_id: direct.id,
            });
        }
    }

    planned
}
