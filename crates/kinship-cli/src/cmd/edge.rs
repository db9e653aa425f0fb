//! `kin add` and `kin rm`: assert or retract a direct subgroup link.

use anyhow::{Context as _, Result};
use clap::Args;
use serde::Serialize;

use kinship_core::{ClosureStore, EdgeId, GroupHierarchy, VertexId};

use crate::cmd::Project;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Arguments for `kin add`.
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Parent group id.
    #[arg(allow_negative_numbers = true)]
    pub parent: i64,

    /// Child group id (becomes a direct subgroup of the parent).
    #[arg(allow_negative_numbers = true)]
    pub child: i64,
}

/// Arguments for `kin rm`.
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Parent group id.
    #[arg(allow_negative_numbers = true)]
    pub parent: i64,

    /// Child group id.
    #[arg(allow_negative_numbers = true)]
    pub child: i64,

    /// Fail when either group is not part of any hierarchy.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Serialize)]
struct AddOutput {
    parent: VertexId,
    child: VertexId,
    edge_id: i64,
    created: bool,
    /// Rows stored after the call.
    rows: usize,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    parent: VertexId,
    child: VertexId,
    removed: bool,
    rows: usize,
}

/// Run `kin add`.
///
/// # Errors
///
/// Returns an error if the link would close a cycle or storage fails.
pub fn run_add(args: &AddArgs, project: &Project, output: OutputMode) -> Result<()> {
    let (parent, child) = (VertexId::new(args.parent), VertexId::new(args.child));
    let mut hierarchy = GroupHierarchy::new(project.open_store()?);

    let existing: Option<EdgeId> = hierarchy.store().direct_edge_id(parent, child)?;
    let edge_id = hierarchy
        .add_subgroup(parent, child)
        .with_context(|| format!("add {parent} -> {child}"))?;

    let out = AddOutput {
        parent,
        child,
        edge_id: edge_id.get(),
        created: existing.is_none(),
        rows: hierarchy.store().rows()?.len(),
    };

    render_mode(
        output,
        &out,
        |out, w| {
            let verb = if out.created { "added" } else { "exists" };
            writeln!(w, "{verb} {} -> {} edge={}", out.parent, out.child, out.edge_id)
        },
        |out, w| {
            let title = if out.created {
                "Subgroup added"
            } else {
                "Subgroup already present"
            };
            pretty_section(w, title)?;
            pretty_kv(w, "Parent", out.parent.to_string())?;
            pretty_kv(w, "Child", out.child.to_string())?;
            pretty_kv(w, "Edge", format!("#{}", out.edge_id))?;
            pretty_kv(w, "Rows", out.rows.to_string())
        },
    )
}

/// Run `kin rm`.
///
/// # Errors
///
/// Returns an error if `--strict` is set and a group is unknown, or if
/// storage fails.
pub fn run_rm(args: &RmArgs, project: &Project, output: OutputMode) -> Result<()> {
    let (parent, child) = (VertexId::new(args.parent), VertexId::new(args.child));
    let mut hierarchy = GroupHierarchy::new(project.open_store()?);

    if args.strict {
        hierarchy.require_group(parent)?;
        hierarchy.require_group(child)?;
    }

    let existed = hierarchy.store().direct_edge_id(parent, child)?.is_some();
    hierarchy
        .remove_subgroup(parent, child)
        .with_context(|| format!("remove {parent} -> {child}"))?;

    let out = RmOutput {
        parent,
        child,
        removed: existed,
        rows: hierarchy.store().rows()?.len(),
    };

    render_mode(
        output,
        &out,
        |out, w| {
            let verb = if out.removed { "removed" } else { "absent" };
            writeln!(w, "{verb} {} -> {}", out.parent, out.child)
        },
        |out, w| {
            let title = if out.removed {
                "Subgroup removed"
            } else {
                "No such subgroup link"
            };
            pretty_section(w, title)?;
            pretty_kv(w, "Parent", out.parent.to_string())?;
            pretty_kv(w, "Child", out.child.to_string())?;
            pretty_kv(w, "Rows", out.rows.to_string())
        },
    )
}
