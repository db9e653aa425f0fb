//! Computing the rows that must disappear with a direct edge.
//!
//! Every derived row is the concatenation `entry + direct + exit` of rows
//! that existed when it was created. A row therefore describes a path that
//! uses the removed edge exactly when its `direct_edge_id` is that edge, or
//! its entry or exit row does. The set is found by mark-and-expand over the
//! provenance back-references:
//!
//! 1. Seed with every row whose `direct_edge_id` is the removed edge (this
//!    includes the direct row itself).
//! 2. Repeatedly add rows whose `entry_edge_id` or `exit_edge_id` names a
//!    marked row.
//!
//! Step 2 runs as a worklist so each marked row's referrers are fetched once.

use std::collections::BTreeSet;

use crate::model::EdgeId;

/// Expand `seed` to every row that transitively depends on it.
///
/// `referencing(id)` must return the ids of rows whose `entry_edge_id` or
/// `exit_edge_id` equals `id`. It is called once per marked row.
///
/// # Errors
///
/// Propagates the first error returned by `referencing`.
pub fn collect_retraction<E, F>(
    seed: impl IntoIterator<Item = EdgeId>,
    mut referencing: F,
) -> Result<BTreeSet<EdgeId>, E>
where
    F: FnMut(EdgeId) -> Result<Vec<EdgeId>, E>,
{
    let mut doomed = BTreeSet::new();
    let mut frontier = Vec::new();

    for id in seed {
        if doomed.insert(id) {
            frontier.push(id);
        }
    }

    while let Some(id) = frontier.pop() {
        for dependent in referencing(id)? {
            if doomed.insert(dependent) {
                frontier.push(dependent);
            }
        }
    }

    Ok(doomed)
}
