#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use cmd::Project;
use cmd::query::Direction;
use output::{CliError, OutputMode, render_error};
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "kin: acyclic group hierarchies on a closure table",
    long_about = None
)]
struct Cli {
    /// Enable info-level logging for kinship crates.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format: pretty, text, or json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a kinship project",
        long_about = "Create .kinship/ with a default config and an empty graph database.",
        after_help = "EXAMPLES:\n    # Initialize a project in the current directory\n    kin init\n\n    # Rewrite the config files, keeping the database\n    kin init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Make CHILD a direct subgroup of PARENT",
        long_about = "Add a direct edge PARENT -> CHILD and derive every path it creates. \
                      Rejected when CHILD already reaches PARENT.",
        after_help = "EXAMPLES:\n    # Group 2 becomes a subgroup of group 1\n    kin add 1 2\n\n    # Emit machine-readable output\n    kin add 1 2 --json"
    )]
    Add(cmd::edge::AddArgs),

    #[command(
        next_help_heading = "Edit",
        about = "Remove the direct edge PARENT -> CHILD",
        long_about = "Remove a direct edge and every derived path that depended on it. \
                      Removing an absent edge is a no-op.",
        after_help = "EXAMPLES:\n    # Detach group 2 from group 1\n    kin rm 1 2\n\n    # Fail if group 1 is unknown\n    kin rm 1 2 --strict"
    )]
    Rm(cmd::edge::RmArgs),

    #[command(
        next_help_heading = "Read",
        about = "List every group below GROUP",
        after_help = "EXAMPLES:\n    # All subgroups, transitively\n    kin descendants 1\n\n    # Only direct subgroups\n    kin descendants 1 --direct"
    )]
    Descendants(cmd::query::QueryArgs),

    #[command(
        next_help_heading = "Read",
        about = "List every group above GROUP",
        after_help = "EXAMPLES:\n    # All supergroups, transitively\n    kin ancestors 3\n\n    # Only direct parents, as JSON\n    kin ancestors 3 --direct --json"
    )]
    Ancestors(cmd::query::QueryArgs),

    #[command(
        next_help_heading = "Read",
        about = "Check whether ANCESTOR reaches DESCENDANT",
        after_help = "EXAMPLES:\n    # Prints true or false\n    kin check 1 3 --format text"
    )]
    Check(cmd::query::CheckArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show the neighbourhood of one group",
        after_help = "EXAMPLES:\n    kin show 2"
    )]
    Show(cmd::query::ShowArgs),

    #[command(
        next_help_heading = "Read",
        about = "Dump closure rows with provenance",
        after_help = "EXAMPLES:\n    # Every row\n    kin edges\n\n    # Only the direct edges\n    kin edges --direct"
    )]
    Edges(cmd::edges::EdgesArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Export direct edges as JSON",
        after_help = "EXAMPLES:\n    kin export --output edges.json"
    )]
    Export(cmd::edges::ExportArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Import direct edges from a JSON document",
        long_about = "Add every edge of an exported document in order. Stops at the first \
                      edge that would close a cycle; earlier edges stay.",
        after_help = "EXAMPLES:\n    kin import --file edges.json"
    )]
    Import(cmd::edges::ImportArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Audit the closure table",
        long_about = "Recompute path counts from the direct edges and check every row's \
                      provenance. Exits non-zero when a violation is found.",
        after_help = "EXAMPLES:\n    kin verify\n\n    kin verify --json"
    )]
    Verify,

    #[command(
        next_help_heading = "Maintenance",
        about = "Re-derive the closure from the direct edges",
        after_help = "EXAMPLES:\n    kin rebuild"
    )]
    Rebuild,

    #[command(
        next_help_heading = "Setup",
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    kin completions bash > ~/.local/share/bash-completion/completions/kin"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("KINSHIP_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "kinship_core=debug,kin=debug,warn"
        } else if verbose {
            "kinship_core=info,kin=info,warn"
        } else {
            "warn"
        })
    });

    let format = env::var("KINSHIP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    // stdout carries command output.
    let registry = tracing_subscriber::registry().with(filter);
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn require_project(located: anyhow::Result<Option<Project>>, cwd: &Path) -> anyhow::Result<Project> {
    located?.ok_or_else(|| cmd::not_initialized(cwd))
}

fn run(
    command: Commands,
    cwd: &Path,
    located: anyhow::Result<Option<Project>>,
    output: OutputMode,
) -> anyhow::Result<()> {
    match command {
        Commands::Init(args) => cmd::init::run_init(&args, cwd, output),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
        Commands::Add(args) => cmd::edge::run_add(&args, &require_project(located, cwd)?, output),
        Commands::Rm(args) => cmd::edge::run_rm(&args, &require_project(located, cwd)?, output),
        Commands::Descendants(args) => {
            let project = require_project(located, cwd)?;
            cmd::query::run_list(&args, Direction::Down, &project, output)
        }
        Commands::Ancestors(args) => {
            let project = require_project(located, cwd)?;
            cmd::query::run_list(&args, Direction::Up, &project, output)
        }
        Commands::Check(args) => {
            cmd::query::run_check(&args, &require_project(located, cwd)?, output)
        }
        Commands::Show(args) => {
            cmd::query::run_show(&args, &require_project(located, cwd)?, output)
        }
        Commands::Edges(args) => {
            cmd::edges::run_edges(&args, &require_project(located, cwd)?, output)
        }
        Commands::Export(args) => cmd::edges::run_export(&args, &require_project(located, cwd)?),
        Commands::Import(args) => {
            cmd::edges::run_import(&args, &require_project(located, cwd)?, output)
        }
        Commands::Verify => cmd::verify::run_verify(&require_project(located, cwd)?, output),
        Commands::Rebuild => cmd::rebuild::run_rebuild(&require_project(located, cwd)?, output),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let located = Project::locate(&cwd);
    let project_config = located
        .as_ref()
        .ok()
        .and_then(Option::as_ref)
        .map(|project| &project.config);
    let output = output::resolve_output_mode(cli.format, cli.json, project_config);
    debug!(?output, cwd = %cwd.display(), "resolved output mode");

    match run(cli.command, &cwd, located, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = cmd::error_code(&err);
            debug!(error = ?err, code = code.code(), "command failed");
            if render_error(output, &CliError::new(code, format!("{err:#}"))).is_err() {
                eprintln!("error[{code}]: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
