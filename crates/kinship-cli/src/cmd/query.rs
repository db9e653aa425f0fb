//! Read-only reachability commands: `descendants`, `ancestors`, `check`,
//! and `show`.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use kinship_core::{ClosureStore, GraphError, GroupHierarchy, SqliteClosureStore, VertexId};

use crate::cmd::Project;
use crate::output::{OutputMode, join_ids, pretty_kv, pretty_section, render_mode};

/// Arguments shared by `kin descendants` and `kin ancestors`.
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Group id to start from.
    #[arg(allow_negative_numbers = true)]
    pub group: i64,

    /// Only list direct neighbours instead of the full closure.
    #[arg(long)]
    pub direct: bool,

    /// Fail when the group is not part of any hierarchy.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `kin check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Candidate ancestor.
    #[arg(allow_negative_numbers = true)]
    pub ancestor: i64,

    /// Candidate descendant.
    #[arg(allow_negative_numbers = true)]
    pub descendant: i64,
}

/// Arguments for `kin show`.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Group id.
    #[arg(allow_negative_numbers = true)]
    pub group: i64,
}

#[derive(Debug, Clone, Copy)]
pub enum Direction {
    Down,
    Up,
}

impl Direction {
    const fn label(self) -> &'static str {
        match self {
            Self::Down => "descendants",
            Self::Up => "ancestors",
        }
    }
}

#[derive(Debug, Serialize)]
struct ListOutput {
    group: VertexId,
    relation: &'static str,
    direct: bool,
    groups: Vec<VertexId>,
}

#[derive(Debug, Serialize)]
struct CheckOutput {
    ancestor: VertexId,
    descendant: VertexId,
    reachable: bool,
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    group: VertexId,
    known: bool,
    parents: Vec<VertexId>,
    children: Vec<VertexId>,
    ancestors: Vec<VertexId>,
    descendants: Vec<VertexId>,
}

fn list(
    hierarchy: &GroupHierarchy<SqliteClosureStore>,
    group: VertexId,
    direction: Direction,
    args: &QueryArgs,
) -> Result<Vec<VertexId>, GraphError> {
    match (direction, args.direct, args.strict) {
        (Direction::Down, true, strict) => {
            if strict {
                hierarchy.require_group(group)?;
            }
            hierarchy.direct_subgroup_ids(group)
        }
        (Direction::Up, true, strict) => {
            if strict {
                hierarchy.require_group(group)?;
            }
            hierarchy.direct_supergroup_ids(group)
        }
        (Direction::Down, false, true) => hierarchy.checked_subgroup_ids(group),
        (Direction::Down, false, false) => hierarchy.subgroup_ids(group),
        (Direction::Up, false, true) => hierarchy.checked_supergroup_ids(group),
        (Direction::Up, false, false) => hierarchy.supergroup_ids(group),
    }
}

/// Run `kin descendants` or `kin ancestors`.
///
/// # Errors
///
/// Returns an error if `--strict` is set and the group is unknown, or if
/// storage fails.
pub fn run_list(
    args: &QueryArgs,
    direction: Direction,
    project: &Project,
    output: OutputMode,
) -> Result<()> {
    let group = VertexId::new(args.group);
    let hierarchy = GroupHierarchy::new(project.open_store()?);
    let groups = list(&hierarchy, group, direction, args)?;

    let out = ListOutput {
        group,
        relation: direction.label(),
        direct: args.direct,
        groups,
    };

    render_mode(
        output,
        &out,
        |out, w| {
            for id in &out.groups {
                writeln!(w, "{id}")?;
            }
            Ok(())
        },
        |out, w| {
            let scope = if out.direct { "Direct " } else { "" };
            pretty_section(w, &format!("{scope}{} of group {}", out.relation, out.group))?;
            if out.groups.is_empty() {
                writeln!(w, "(none)")
            } else {
                writeln!(w, "{}", join_ids(&out.groups))
            }
        },
    )
}

/// Run `kin check`: does `ancestor` reach `descendant`?
///
/// # Errors
///
/// Returns an error if storage fails.
pub fn run_check(args: &CheckArgs, project: &Project, output: OutputMode) -> Result<()> {
    let ancestor = VertexId::new(args.ancestor);
    let descendant = VertexId::new(args.descendant);
    let hierarchy = GroupHierarchy::new(project.open_store()?);

    let out = CheckOutput {
        ancestor,
        descendant,
        reachable: hierarchy.group_has_subgroup(ancestor, descendant)?,
    };

    render_mode(
        output,
        &out,
        |out, w| writeln!(w, "{}", out.reachable),
        |out, w| {
            let verdict = if out.reachable { "is" } else { "is not" };
            writeln!(
                w,
                "group {} {verdict} an ancestor of group {}",
                out.ancestor, out.descendant
            )
        },
    )
}

/// Run `kin show`: direct and transitive neighbourhood of one group.
///
/// # Errors
///
/// Returns an error if storage fails.
pub fn run_show(args: &ShowArgs, project: &Project, output: OutputMode) -> Result<()> {
    let group = VertexId::new(args.group);
    let hierarchy = GroupHierarchy::new(project.open_store()?);

    let out = ShowOutput {
        group,
        known: hierarchy.store().contains_vertex(group)?,
        parents: hierarchy.direct_supergroup_ids(group)?,
        children: hierarchy.direct_subgroup_ids(group)?,
        ancestors: hierarchy.supergroup_ids(group)?,
        descendants: hierarchy.subgroup_ids(group)?,
    };

    render_mode(
        output,
        &out,
        |out, w| {
            writeln!(w, "group {}", out.group)?;
            writeln!(w, "parents {}", join_ids(&out.parents))?;
            writeln!(w, "children {}", join_ids(&out.children))?;
            writeln!(w, "ancestors {}", join_ids(&out.ancestors))?;
            writeln!(w, "descendants {}", join_ids(&out.descendants))
        },
        |out, w| {
            pretty_section(w, &format!("Group {}", out.group))?;
            if !out.known {
                writeln!(w, "(not part of any hierarchy)")?;
            }
            pretty_kv(w, "Parents", join_ids(&out.parents))?;
            pretty_kv(w, "Children", join_ids(&out.children))?;
            pretty_kv(w, "Ancestors", join_ids(&out.ancestors))?;
            pretty_kv(w, "Descendants", join_ids(&out.descendants))
        },
    )
}
