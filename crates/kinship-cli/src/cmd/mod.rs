pub mod completions;
pub mod edge;
pub mod edges;
pub mod init;
pub mod query;
pub mod rebuild;
pub mod verify;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use kinship_core::config::{KINSHIP_DIR, ProjectConfig, load_project_config};
use kinship_core::{ErrorCode, GraphError, SqliteClosureStore};

/// A failure that carries its own stable error code.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CodedError {
    pub code: ErrorCode,
    pub message: String,
}

impl CodedError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Pick the error code for a failure from anywhere in its context chain.
pub fn error_code(err: &anyhow::Error) -> ErrorCode {
    for cause in err.chain() {
        if let Some(coded) = cause.downcast_ref::<CodedError>() {
            return coded.code;
        }
        if let Some(graph) = cause.downcast_ref::<GraphError>() {
            return graph.code();
        }
        if let Some(sqlite) = cause.downcast_ref::<rusqlite::Error>() {
            return match sqlite.sqlite_error_code() {
                Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked) => {
                    ErrorCode::LockContention
                }
                _ => ErrorCode::StorageFailure,
            };
        }
    }
    ErrorCode::InternalUnexpected
}

/// An initialized project: its `.kinship/` directory and config.
#[derive(Debug)]
pub struct Project {
    pub kinship_dir: PathBuf,
    pub config: ProjectConfig,
}

impl Project {
    /// Find the nearest `.kinship/` at or above `start` and load its config.
    ///
    /// Returns `Ok(None)` when no ancestor is initialized.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn locate(start: &Path) -> Result<Option<Self>> {
        let Some(kinship_dir) = find_kinship_dir(start) else {
            return Ok(None);
        };
        let root = kinship_dir.parent().unwrap_or(start);
        let config = load_project_config(root)
            .map_err(|err| CodedError::new(ErrorCode::ConfigParseError, format!("{err:#}")))?;
        Ok(Some(Self {
            kinship_dir,
            config,
        }))
    }

    pub fn database_path(&self) -> PathBuf {
        self.config.database_path(&self.kinship_dir)
    }

    /// Open the project's closure database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_store(&self) -> Result<SqliteClosureStore> {
        let path = self.database_path();
        SqliteClosureStore::open(&path, self.config.busy_timeout())
            .with_context(|| format!("open closure store {}", path.display()))
    }
}

/// The error returned when a command needs a project and none was found.
pub fn not_initialized(start: &Path) -> anyhow::Error {
    CodedError::new(
        ErrorCode::NotInitialized,
        format!("no {KINSHIP_DIR}/ directory in {} or any parent", start.display()),
    )
    .into()
}

fn find_kinship_dir(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(KINSHIP_DIR);
        if candidate.is_dir() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_walks_up_to_the_nearest_project() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(dir.path().join(KINSHIP_DIR)).expect("create .kinship");
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("create nested");

        let project = Project::locate(&nested).expect("locate").expect("found");
        assert_eq!(project.kinship_dir, dir.path().join(KINSHIP_DIR));
        assert_eq!(project.database_path(), dir.path().join(KINSHIP_DIR).join("graph.db"));
    }

    #[test]
    fn locate_without_project_is_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(Project::locate(dir.path()).expect("locate").is_none());
    }

    #[test]
    fn bad_config_is_a_config_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let kinship = dir.path().join(KINSHIP_DIR);
        std::fs::create_dir_all(&kinship).expect("create .kinship");
        std::fs::write(kinship.join("config.toml"), "[storage").expect("write");

        let err = Project::locate(dir.path()).expect_err("parse error");
        assert_eq!(error_code(&err), ErrorCode::ConfigParseError);
    }

    #[test]
    fn graph_errors_keep_their_code_through_context() {
        let err = anyhow::Error::new(GraphError::UnknownVertex(7.into())).context("rm 7 8");
        assert_eq!(error_code(&err), ErrorCode::UnknownVertex);
        assert_eq!(error_code(&not_initialized(Path::new("/"))), ErrorCode::NotInitialized);
        assert_eq!(
            error_code(&anyhow::anyhow!("something else")),
            ErrorCode::InternalUnexpected
        );
    }
}
