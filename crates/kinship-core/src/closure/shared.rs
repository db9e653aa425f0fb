//! Thread-safe handle over any closure backend.
//!
//! Readers share the lock; each mutation holds the write lock for its whole
//! duration, so no reader ever observes a half-applied edge and two writers
//! can never plan rows from the same stale snapshot.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::closure::{ClosureStore, MemoryClosureStore};
use crate::error::GraphError;
use crate::model::{ClosureEdge, DirectEdge, EdgeId, VertexId};

/// Cloneable, `Send + Sync` handle to a closure store.
#[derive(Debug, Default)]
pub struct SharedClosureStore<S = MemoryClosureStore> {
    inner: Arc<RwLock<S>>,
}

impl<S> Clone for SharedClosureStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ClosureStore> SharedClosureStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, S>, GraphError> {
        self.inner.read().map_err(|_| GraphError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, S>, GraphError> {
        self.inner.write().map_err(|_| GraphError::Poisoned)
    }

    /// # Errors
    ///
    /// See [`ClosureStore::add_edge`]; [`GraphError::Poisoned`] if a writer
    /// panicked.
    pub fn add_edge(&self, parent: VertexId, child: VertexId) -> Result<EdgeId, GraphError> {
        self.write()?.add_edge(parent, child)
    }

    /// # Errors
    ///
    /// See [`ClosureStore::remove_edge`].
    pub fn remove_edge(&self, parent: VertexId, child: VertexId) -> Result<(), GraphError> {
        self.write()?.remove_edge(parent, child)
    }

    /// # Errors
    ///
    /// See [`ClosureStore::descendants`].
    pub fn descendants(&self, vertex: VertexId) -> Result<Vec<VertexId>, GraphError> {
        self.read()?.descendants(vertex)
    }

    /// # Errors
    ///
    /// See [`ClosureStore::ancestors`].
    pub fn ancestors(&self, vertex: VertexId) -> Result<Vec<VertexId>, GraphError> {
        self.read()?.ancestors(vertex)
    }

    /// # Errors
    ///
    /// See [`ClosureStore::is_ancestor`].
    pub fn is_ancestor(&self, a: VertexId, b: VertexId) -> Result<bool, GraphError> {
        self.read()?.is_ancestor(a, b)
    }

    /// # Errors
    ///
    /// See [`ClosureStore::is_descendant`].
    pub fn is_descendant(&self, a: VertexId, b: VertexId) -> Result<bool, GraphError> {
        self.read()?.is_descendant(a, b)
    }

    /// # Errors
    ///
    /// See [`ClosureStore::rows`].
    pub fn rows(&self) -> Result<Vec<ClosureEdge>, GraphError> {
        self.read()?.rows()
    }

    /// # Errors
    ///
    /// See [`ClosureStore::direct_edges`].
    pub fn direct_edges(&self) -> Result<Vec<DirectEdge>, GraphError> {
        self.read()?.direct_edges()
    }

    /// Run `f` with exclusive access, as one atomic unit.
    ///
    /// # Errors
    ///
    /// [`GraphError::Poisoned`], or whatever `f` returns.
    pub fn with_write<T>(
        &self,
        f: impl FnOnce(&mut S) -> Result<T, GraphError>,
    ) -> Result<T, GraphError> {
        let mut guard = self.write()?;
        f(&mut guard)
    }
}
