use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory holding a project's graph database and config.
pub const KINSHIP_DIR: &str = ".kinship";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl ProjectConfig {
    /// Database location, resolved against the `.kinship/` directory when
    /// the configured path is relative.
    #[must_use]
    pub fn database_path(&self, kinship_dir: &Path) -> PathBuf {
        if self.storage.database.is_absolute() {
            self.storage.database.clone()
        } else {
            kinship_dir.join(&self.storage.database)
        }
    }

    #[must_use]
    pub const fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.storage.busy_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

/// Load `.kinship/config.toml` under `project_root`, or defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(KINSHIP_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load the per-user config from the platform config directory.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("kinship/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Serialize the default project config, as written by `kin init`.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn default_project_config_toml() -> Result<String> {
    toml::to_string_pretty(&ProjectConfig::default()).context("serialize default config")
}

/// Pick the output mode: explicit flag, then `FORMAT`, then project config,
/// then user config, then TTY detection.
///
/// # Errors
///
/// Returns an error if an explicit flag value is not a known mode.
pub fn resolve_output(
    cli_format: Option<&str>,
    project: &ProjectConfig,
    user: &UserConfig,
) -> Result<String> {
    let env_format = env::var("FORMAT").ok();
    resolve_output_inner(
        cli_format,
        env_format.as_deref(),
        project.output.format.as_deref(),
        user.output.as_deref(),
        std::io::stdout().is_terminal(),
    )
}

fn normalize_output_mode(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pretty" | "human" => Some("pretty"),
        "text" | "plain" => Some("text"),
        "json" => Some("json"),
        _ => None,
    }
}

fn resolve_output_inner(
    cli_format: Option<&str>,
    env_format: Option<&str>,
    project_format: Option<&str>,
    user_format: Option<&str>,
    is_tty: bool,
) -> Result<String> {
    if let Some(raw) = cli_format {
        return normalize_output_mode(raw)
            .map(str::to_string)
            .with_context(|| format!("unknown output format '{raw}'"));
    }

    let fallback = [env_format, project_format, user_format]
        .into_iter()
        .flatten()
        .find_map(normalize_output_mode);
    if let Some(mode) = fallback {
        return Ok(mode.to_string());
    }

    Ok(if is_tty { "pretty" } else { "text" }.to_string())
}

fn default_database() -> PathBuf {
    PathBuf::from("graph.db")
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}
