use anyhow::Result;
use serde::Serialize;

use kinship_core::rebuild::rebuild;

use crate::cmd::Project;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Debug, Serialize)]
struct RebuildOutput {
    direct_edges: usize,
    rows_before: usize,
    rows_after: usize,
    elapsed_ms: u128,
}

/// Run `kin rebuild`: re-derive every closure row from the direct edges.
///
/// # Errors
///
/// Returns an error if the stored direct edges are cyclic or storage fails.
pub fn run_rebuild(project: &Project, output: OutputMode) -> Result<()> {
    let mut store = project.open_store()?;
    let report = rebuild(&mut store)?;

    let out = RebuildOutput {
        direct_edges: report.direct_edges,
        rows_before: report.rows_before,
        rows_after: report.rows_after,
        elapsed_ms: report.elapsed.as_millis(),
    };

    render_mode(
        output,
        &out,
        |out, w| {
            writeln!(
                w,
                "rebuild: direct={} rows_before={} rows_after={} elapsed_ms={}",
                out.direct_edges, out.rows_before, out.rows_after, out.elapsed_ms
            )
        },
        |out, w| {
            pretty_section(w, "Closure rebuilt")?;
            pretty_kv(w, "Direct edges", out.direct_edges.to_string())?;
            pretty_kv(w, "Rows before", out.rows_before.to_string())?;
            pretty_kv(w, "Rows after", out.rows_after.to_string())?;
            pretty_kv(w, "Elapsed", format!("{} ms", out.elapsed_ms))
        },
    )
}
