use std::fmt;

use crate::model::VertexId;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    CycleDetected,
    UnknownVertex,
    CorruptClosure,
    StorageFailure,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::CycleDetected => "E2001",
            Self::UnknownVertex => "E2002",
            Self::CorruptClosure => "E3001",
            Self::StorageFailure => "E5001",
            Self::LockContention => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Project not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::CycleDetected => "Cycle would be created",
            Self::UnknownVertex => "Unknown group",
            Self::CorruptClosure => "Closure table is inconsistent",
            Self::StorageFailure => "Storage backend failure",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `kin init` to initialize this directory."),
            Self::ConfigParseError => Some("Fix syntax in .kinship/config.toml and retry."),
            Self::CycleDetected => {
                Some("Pick a different parent: the child already contains the parent.")
            }
            Self::UnknownVertex => None,
            Self::CorruptClosure => Some("Run `kin rebuild` to re-derive the closure table."),
            Self::StorageFailure => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other writer commits."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors raised by closure-table operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Adding `parent -> child` would close a cycle. Self-loops land here too.
    #[error(
        "cannot add group {child} as a subgroup of group {parent}: group {parent} is already a descendant of group {child}"
    )]
    Cycle { parent: VertexId, child: VertexId },

    /// The vertex has no closure rows at all.
    #[error("group {0} is not part of any hierarchy")]
    UnknownVertex(VertexId),

    /// Backend failure, surfaced verbatim.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A writer panicked while holding the in-memory store lock.
    #[error("closure store lock poisoned")]
    Poisoned,
}

impl GraphError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Cycle { .. } => ErrorCode::CycleDetected,
            Self::UnknownVertex(_) => ErrorCode::UnknownVertex,
            Self::Storage(rusqlite::Error::SqliteFailure(err, _))
                if matches!(
                    err.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                ) =>
            {
                ErrorCode::LockContention
            }
            Self::Storage(_) => ErrorCode::StorageFailure,
            Self::Poisoned => ErrorCode::InternalUnexpected,
        }
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    /// Returns `true` for [`GraphError::Cycle`].
    #[must_use]
    pub const fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle { .. })
    }
}
