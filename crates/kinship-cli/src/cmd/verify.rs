use std::io::Write;

use anyhow::Result;

use kinship_core::ErrorCode;
use kinship_core::audit::{AuditReport, audit};

use crate::cmd::{CodedError, Project};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

/// Run `kin verify`: audit every closure row against the direct edges.
///
/// # Errors
///
/// Returns a [`CodedError`] with [`ErrorCode::CorruptClosure`] when the
/// audit finds violations, or an error if storage fails.
pub fn run_verify(project: &Project, output: OutputMode) -> Result<()> {
    let store = project.open_store()?;
    let report = audit(&store)?;

    render_mode(output, &report, write_text, write_pretty)?;

    if report.is_ok() {
        Ok(())
    } else {
        Err(CodedError::new(
            ErrorCode::CorruptClosure,
            format!("verify: {} violation(s)", report.violations.len()),
        )
        .into())
    }
}

fn write_text(report: &AuditReport, w: &mut dyn Write) -> std::io::Result<()> {
    for violation in &report.violations {
        writeln!(w, "FAIL {violation}")?;
    }
    if report.is_ok() {
        writeln!(
            w,
            "verify: success rows={} direct={} pairs={}",
            report.rows, report.direct_edges, report.reachable_pairs
        )?;
    }
    Ok(())
}

fn write_pretty(report: &AuditReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, "Closure audit")?;
    pretty_kv(w, "Rows", report.rows.to_string())?;
    pretty_kv(w, "Direct edges", report.direct_edges.to_string())?;
    pretty_kv(w, "Pairs", report.reachable_pairs.to_string())?;
    writeln!(w)?;
    if report.is_ok() {
        writeln!(w, "OK   no violations")
    } else {
        for violation in &report.violations {
            writeln!(w, "FAIL {violation}")?;
        }
        Ok(())
    }
}
