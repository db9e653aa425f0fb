//! kinship-core library.
//!
//! A closure-table store for group hierarchies: every path between two
//! groups is materialized as a row, so ancestry questions are lookups.
//!
//! # Conventions
//!
//! - **Errors**: closure operations return [`error::GraphError`]; file and
//!   configuration plumbing uses `anyhow::Result` with context.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod alloc;
pub mod audit;
pub mod closure;
pub mod config;
pub mod db;
pub mod error;
pub mod hierarchy;
pub mod model;
pub mod rebuild;

pub use closure::{ClosureStore, MemoryClosureStore, SharedClosureStore};
pub use db::SqliteClosureStore;
pub use error::{ErrorCode, GraphError};
pub use hierarchy::GroupHierarchy;
pub use model::{ClosureEdge, DirectEdge, EdgeId, VertexId};
