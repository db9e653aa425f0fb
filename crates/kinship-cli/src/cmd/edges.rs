//! `kin edges`, `kin export`, and `kin import`.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;

use kinship_core::model::ClosureEdge;
use kinship_core::rebuild::{EdgeDocument, ImportReport, import_edges};
use kinship_core::ClosureStore;

use crate::cmd::Project;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `kin edges`.
#[derive(Args, Debug)]
pub struct EdgesArgs {
    /// Only list direct edges.
    #[arg(long)]
    pub direct: bool,
}

/// Arguments for `kin export`.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Write the edge document here instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Arguments for `kin import`.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Edge document produced by `kin export`.
    #[arg(long, short)]
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
struct EdgesOutput {
    rows: Vec<ClosureEdge>,
}

#[derive(Debug, Serialize)]
struct ImportOutput {
    file: String,
    #[serde(flatten)]
    report: ImportReport,
}

/// Run `kin edges`: dump closure rows with their provenance.
///
/// # Errors
///
/// Returns an error if storage fails.
pub fn run_edges(args: &EdgesArgs, project: &Project, output: OutputMode) -> Result<()> {
    let store = project.open_store()?;
    let mut rows = store.rows()?;
    if args.direct {
        rows.retain(ClosureEdge::is_direct);
    }
    let out = EdgesOutput { rows };

    render_mode(
        output,
        &out,
        |out, w| {
            for row in &out.rows {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    row.id.get(),
                    row.start,
                    row.end,
                    row.hops,
                    row.entry_edge_id.get(),
                    row.direct_edge_id.get(),
                    row.exit_edge_id.get()
                )?;
            }
            Ok(())
        },
        |out, w| {
            pretty_section(w, &format!("Closure rows ({})", out.rows.len()))?;
            writeln!(
                w,
                "{:>6}  {:>8} {:>8}  {:>4}  {:>6} {:>6} {:>6}",
                "ID", "START", "END", "HOPS", "ENTRY", "DIRECT", "EXIT"
            )?;
            for row in &out.rows {
                writeln!(
                    w,
                    "{:>6}  {:>8} {:>8}  {:>4}  {:>6} {:>6} {:>6}",
                    row.id.get(),
                    row.start,
                    row.end,
                    row.hops,
                    row.entry_edge_id.get(),
                    row.direct_edge_id.get(),
                    row.exit_edge_id.get()
                )?;
            }
            Ok(())
        },
    )
}

/// Run `kin export`: write the direct edges as a JSON edge document.
///
/// # Errors
///
/// Returns an error if storage fails or the output file cannot be written.
pub fn run_export(args: &ExportArgs, project: &Project) -> Result<()> {
    let store = project.open_store()?;
    let document = EdgeDocument::from_store(&store)?;
    let json = serde_json::to_string_pretty(&document)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("write {}", path.display()))?;
            tracing::info!(path = %path.display(), edges = document.edges.len(), "exported edges");
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            writeln!(out, "{json}")?;
        }
    }
    Ok(())
}

/// Run `kin import`: add every edge of a document, in order.
///
/// # Errors
///
/// Returns an error if the document is malformed, an edge would close a
/// cycle (edges before it stay), or storage fails.
pub fn run_import(args: &ImportArgs, project: &Project, output: OutputMode) -> Result<()> {
    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("read {}", args.file.display()))?;
    let document = EdgeDocument::parse(&raw)?;

    let mut store = project.open_store()?;
    let report = import_edges(&mut store, &document.edges)
        .with_context(|| format!("import {}", args.file.display()))?;

    let out = ImportOutput {
        file: args.file.display().to_string(),
        report,
    };

    render_mode(
        output,
        &out,
        |out, w| {
            writeln!(
                w,
                "imported added={} existing={}",
                out.report.added, out.report.existing
            )
        },
        |out, w| {
            pretty_section(w, "Import complete")?;
            pretty_kv(w, "File", &out.file)?;
            pretty_kv(w, "Added", out.report.added.to_string())?;
            pretty_kv(w, "Existing", out.report.existing.to_string())
        },
    )
}
