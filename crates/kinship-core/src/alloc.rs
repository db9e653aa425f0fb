use crate::model::EdgeId;

/// Hands out closure-row identities for the in-memory backend.
///
/// Ids increase monotonically from 1 and are never handed out twice, even
/// after the rows they named have been deleted, so provenance references can
/// never be confused with a newer row.
#[derive(Debug, Clone)]
pub struct EdgeIdAllocator {
    next: i64,
}

impl Default for EdgeIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl EdgeIdAllocator {
    /// Create an allocator whose first id is `#1`.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Create an allocator that continues after `last`.
    #[must_use]
    pub const fn resume_after(last: EdgeId) -> Self {
        Self {
            next: last.get().saturating_add(1),
        }
    }

    /// Allocate the next id.
    pub const fn allocate(&mut self) -> EdgeId {
        let id = EdgeId::new(self.next);
        self.next += 1;
        id
    }

    /// The id the next call to [`allocate`](Self::allocate) will return.
    #[must_use]
    pub const fn peek(&self) -> EdgeId {
        EdgeId::new(self.next)
    }
}
