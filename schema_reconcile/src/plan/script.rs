//! SQL script output
//!
//! Renders a plan as a script a DBA can review and run by hand with the
//! dialect's usual client.

use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::dialect::Dialect;
use crate::error::Result;
use crate::plan::{Finding, RepairPlan};
use crate::utils::naming::create_plan_file_name;

/// Render `plan` as a script; findings are listed as comments at the end
pub fn render_script(
    plan: &RepairPlan,
    findings: &[Finding],
    dialect: Dialect,
    generated_at: DateTime<Utc>,
) -> String {
    let mut script = String::new();

    script.push_str(&format!("-- schema_reconcile repair plan for {}\n", dialect));
    script.push_str(&format!(
        "-- generated {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    script.push_str(&format!(
        "-- {} groups, {} statements\n",
        plan.groups.len(),
        plan.statement_count()
    ));
    if plan.partial {
        script.push_str("-- WARNING: some tables could not be introspected; this plan is partial\n");
    }

    for group in &plan.groups {
        script.push('\n');
        script.push_str(&format!(
            "-- {} {}.{}: {}\n",
            group.action, group.table_name, group.target_name, group.reason
        ));
        for statement in &group.statements {
            script.push_str(&terminate(statement, dialect));
            script.push('\n');
        }
    }

    if !findings.is_empty() {
        script.push_str("\n-- Unrepaired findings:\n");
        for finding in findings {
            script.push_str(&format!("--   {}\n", finding));
        }
    }

    script
}

/// Write the rendered script into `directory`, returning the file path
pub fn write_script(
    directory: &Path,
    plan: &RepairPlan,
    findings: &[Finding],
    dialect: Dialect,
) -> Result<PathBuf> {
    fs::create_dir_all(directory)?;

    let now = Utc::now();
    let path = directory.join(create_plan_file_name(dialect, now));
    let mut file = File::create(&path)?;
    file.write_all(render_script(plan, findings, dialect, now).as_bytes())?;

    tracing::info!(path = %path.display(), "Wrote repair plan");
    Ok(path)
}

fn terminate(statement: &str, dialect: Dialect) -> String {
    let statement = statement.trim_end();
    match dialect {
        // PL/SQL blocks already end in `;` and need `/` to run in SQL*Plus
        Dialect::Oracle if is_plsql_block(statement) => format!("{}\n/", statement),
        Dialect::MsSql => format!("{};\nGO", statement.trim_end_matches(';')),
        _ => format!("{};", statement.trim_end_matches(';')),
    }
}

fn is_plsql_block(statement: &str) -> bool {
    let upper = statement.to_uppercase();
    upper.starts_with("CREATE OR REPLACE TRIGGER")
        || upper.starts_with("BEGIN")
        || upper.starts_with("DECLARE")
}
