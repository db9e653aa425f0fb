use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;
use std::path::Path;

use kinship_core::config::{KINSHIP_DIR, default_project_config_toml};

use crate::cmd::Project;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Rewrite config files even if `.kinship/` already exists. The graph
    /// database is kept.
    #[arg(long)]
    pub force: bool,
}

const GITIGNORE: &str = "graph.db\ngraph.db-wal\ngraph.db-shm\n";

#[derive(Debug, Serialize)]
struct InitOutput {
    kinship_dir: String,
    database: String,
    reinitialized: bool,
}

/// Execute `kin init`. Creates the project skeleton:
///
/// ```text
/// .kinship/
///   config.toml   (default project config)
///   .gitignore    (graph.db and its WAL files)
///   graph.db      (empty closure table at the latest schema)
/// ```
///
/// # Errors
///
/// Returns an error if `.kinship/` already exists and `--force` is not set,
/// or if any filesystem or database operation fails.
pub fn run_init(args: &InitArgs, project_root: &Path, output: OutputMode) -> Result<()> {
    let kinship_dir = project_root.join(KINSHIP_DIR);
    let reinitialized = kinship_dir.exists();

    if reinitialized && !args.force {
        anyhow::bail!("{KINSHIP_DIR}/ already exists. Use `kin init --force` to reinitialize.");
    }

    std::fs::create_dir_all(&kinship_dir)
        .with_context(|| format!("Failed to create {}", kinship_dir.display()))?;

    let config_path = kinship_dir.join("config.toml");
    std::fs::write(&config_path, default_project_config_toml()?)
        .with_context(|| format!("Failed to write config: {}", config_path.display()))?;

    let gitignore_path = kinship_dir.join(".gitignore");
    std::fs::write(&gitignore_path, GITIGNORE)
        .with_context(|| format!("Failed to write .gitignore: {}", gitignore_path.display()))?;

    let project = Project::locate(project_root)?
        .ok_or_else(|| anyhow::anyhow!("{} vanished during init", kinship_dir.display()))?;
    drop(project.open_store()?);

    let out = InitOutput {
        kinship_dir: kinship_dir.display().to_string(),
        database: project.database_path().display().to_string(),
        reinitialized,
    };

    render_mode(
        output,
        &out,
        |out, w| writeln!(w, "initialized {}", out.kinship_dir),
        |out, w| {
            pretty_section(w, "Initialized .kinship/")?;
            pretty_kv(w, "Database", &out.database)?;
            pretty_kv(w, "Config", format!("{KINSHIP_DIR}/config.toml"))?;
            writeln!(w)?;
            writeln!(w, "Next steps:")?;
            writeln!(w, "  Make group 2 a subgroup of group 1:")?;
            writeln!(w, "    kin add 1 2")?;
            writeln!(w, "  List everything below group 1:")?;
            writeln!(w, "    kin descendants 1")
        },
    )
}
