//! Reconciliation engine
//!
//! One pass diffs the reference schema against what the introspector reports
//! and turns every drift item into either a plan group or a finding. The pass
//! never touches the database itself.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

use crate::dialect::DialectRenderer;
use crate::error::Result;
use crate::introspect::Introspector;
use crate::plan::{
    Finding, FindingKind, PlanGroup, Reconciliation, RepairAction, RepairPlan, TargetKind,
};
use crate::schema::diff::{
    constraint_matches, describe_column, describe_constraint, describe_index, index_matches,
    ColumnDelta,
};
use crate::schema::types::{
    ConstraintDefinition, IndexDefinition, SchemaDefinition, TableDefinition,
};

/// Which classes of drift may be repaired automatically.
///
/// Capabilities gate emission only; drift is always detected and, when it is
/// not repaired, reported as a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    pub create_missing_tables: bool,
    pub add_missing_columns: bool,
    pub alter_incorrect_columns: bool,
    pub add_missing_indexes: bool,
    pub repair_mismatched_indexes: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            create_missing_tables: true,
            add_missing_columns: true,
            alter_incorrect_columns: true,
            add_missing_indexes: true,
            repair_mismatched_indexes: true,
        }
    }
}

impl Capabilities {
    /// Detect only
    pub fn none() -> Self {
        Self {
            create_missing_tables: false,
            add_missing_columns: false,
            alter_incorrect_columns: false,
            add_missing_indexes: false,
            repair_mismatched_indexes: false,
        }
    }
}

/// Progress of a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PassStage {
    Start,
    TablesDiffed,
    ColumnsDiffed,
    IndexesDiffed,
    ConstraintsDiffed,
    PlanReady,
}

impl fmt::Display for PassStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PassStage::Start => "start",
            PassStage::TablesDiffed => "tables_diffed",
            PassStage::ColumnsDiffed => "columns_diffed",
            PassStage::IndexesDiffed => "indexes_diffed",
            PassStage::ConstraintsDiffed => "constraints_diffed",
            PassStage::PlanReady => "plan_ready",
        })
    }
}

/// What the tables phase learned about one reference table
enum TableState {
    /// Created by this plan
    Created,
    Existing(TableDefinition),
    /// Absent and not created
    Missing,
    /// Could not be introspected
    Failed,
}

/// Accumulated output of a pass
struct Pass {
    stage: PassStage,
    plan: RepairPlan,
    findings: Vec<Finding>,
    /// Lower-cased tables that will not exist once the plan has run
    absent_tables: HashSet<String>,
    /// Lower-cased (table, column) pairs that will not exist either
    absent_columns: HashSet<(String, String)>,
}

impl Pass {
    fn new() -> Self {
        Self {
            stage: PassStage::Start,
            plan: RepairPlan::new(),
            findings: Vec::new(),
            absent_tables: HashSet::new(),
            absent_columns: HashSet::new(),
        }
    }

    fn mark_table_absent(&mut self, table: &str) {
        self.absent_tables.insert(table.to_lowercase());
    }

    fn mark_column_absent(&mut self, table: &str, column: &str) {
        self.absent_columns
            .insert((table.to_lowercase(), column.to_lowercase()));
    }

    /// Why `table.column` cannot be relied on after the plan, if it cannot
    fn unavailable(&self, table: &str, column: &str) -> Option<String> {
        let table_key = table.to_lowercase();
        if self.absent_tables.contains(&table_key) {
            return Some(format!("table {} does not exist", table));
        }
        if self
            .absent_columns
            .contains(&(table_key, column.to_lowercase()))
        {
            return Some(format!("column {}.{} does not exist", table, column));
        }
        None
    }

    /// First missing column an index depends on
    fn index_dependency(&self, table: &str, index: &IndexDefinition) -> Option<String> {
        index
            .column_names()
            .find_map(|column| self.unavailable(table, column))
    }

    /// First missing column or table a foreign key depends on
    fn constraint_dependency(&self, constraint: &ConstraintDefinition) -> Option<String> {
        self.unavailable(&constraint.table_name, &constraint.column_name)
            .or_else(|| {
                self.unavailable(
                    &constraint.foreign_table_name,
                    &constraint.foreign_column_name,
                )
            })
    }

    fn advance(&mut self, next: PassStage) {
        debug!(from = %self.stage, to = %next, "Reconciliation stage");
        self.stage = next;
    }

    fn find(&mut self, finding: Finding) {
        debug!(finding = %finding, "Drift left in place");
        self.findings.push(finding);
    }

    /// Record a rendered repair; a render failure becomes an Unrenderable finding
    fn repair(&mut self, group: PlanGroup, rendered: Result<Vec<String>>) -> Result<bool> {
        match rendered {
            Ok(statements) if statements.is_empty() => Ok(false),
            Ok(statements) => {
                self.plan.groups.push(group.with_statements(statements));
                Ok(true)
            }
            Err(e) if !e.is_fatal_for_pass() => {
                warn!(
                    table = %group.table_name,
                    target = %group.target_name,
                    error = %e,
                    "Repair cannot be rendered"
                );
                self.findings.push(
                    Finding::new(
                        FindingKind::Unrenderable,
                        group.target_kind,
                        &group.table_name,
                        &group.target_name,
                    )
                    .expected(group.reason)
                    .actual(e.to_string()),
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn finish(mut self) -> Reconciliation {
        // Stable, so per-table and reference order survive within a phase
        self.plan.groups.sort_by_key(|group| group.action.phase());
        self.advance(PassStage::PlanReady);

        Reconciliation {
            plan: self.plan,
            findings: self.findings,
        }
    }
}

/// Diffs a reference schema against introspected metadata for one dialect
pub struct Reconciler<'a> {
    renderer: &'a dyn DialectRenderer,
    capabilities: Capabilities,
}

impl<'a> Reconciler<'a> {
    pub fn new(renderer: &'a dyn DialectRenderer, capabilities: Capabilities) -> Self {
        Self {
            renderer,
            capabilities,
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Run one full pass.
    ///
    /// Only configuration-class errors and an unavailable introspector abort
    /// the pass; everything else ends up in the plan or the findings.
    pub fn reconcile(
        &self,
        reference: &SchemaDefinition,
        introspector: &dyn Introspector,
    ) -> Result<Reconciliation> {
        let mut pass = Pass::new();

        let mut states = Vec::with_capacity(reference.tables.len());
        for table in reference.tables.values() {
            let state = self.diff_table(table, introspector, &mut pass)?;
            if matches!(state, TableState::Missing | TableState::Failed) {
                pass.mark_table_absent(&table.table_name);
            }
            states.push((table, state));
        }
        pass.advance(PassStage::TablesDiffed);

        for (table, state) in &states {
            if let TableState::Existing(actual) = state {
                self.diff_columns(table, actual, &mut pass)?;
            }
        }
        pass.advance(PassStage::ColumnsDiffed);

        for (table, state) in &states {
            if let TableState::Existing(actual) = state {
                self.diff_indexes(table, actual, &mut pass)?;
            }
        }
        pass.advance(PassStage::IndexesDiffed);

        for (table, state) in &states {
            match state {
                TableState::Created => self.create_constraints(table, &mut pass)?,
                TableState::Existing(actual) => self.diff_constraints(table, actual, &mut pass)?,
                TableState::Missing | TableState::Failed => {}
            }
        }
        pass.advance(PassStage::ConstraintsDiffed);

        let reconciliation = pass.finish();
        info!(
            dialect = %self.renderer.dialect(),
            tables = reference.tables.len(),
            groups = reconciliation.plan.groups.len(),
            statements = reconciliation.plan.statement_count(),
            findings = reconciliation.findings.len(),
            partial = reconciliation.plan.partial,
            "Reconciliation complete"
        );

        Ok(reconciliation)
    }

    fn diff_table(
        &self,
        table: &TableDefinition,
        introspector: &dyn Introspector,
        pass: &mut Pass,
    ) -> Result<TableState> {
        let name = &table.table_name;

        let actual = match introspector.table(name) {
            Ok(actual) => actual,
            Err(e) if !e.is_fatal_for_pass() => {
                warn!(table = %name, error = %e, "Table could not be introspected");
                pass.plan.partial = true;
                pass.find(
                    Finding::new(FindingKind::IntrospectionFailed, TargetKind::Table, name, name)
                        .actual(e.to_string()),
                );
                return Ok(TableState::Failed);
            }
            Err(e) => return Err(e),
        };

        if let Some(actual) = actual {
            return Ok(TableState::Existing(actual));
        }

        if !self.capabilities.create_missing_tables {
            pass.find(Finding::new(
                FindingKind::MissingTable,
                TargetKind::Table,
                name,
                name,
            ));
            return Ok(TableState::Missing);
        }

        let group = PlanGroup::new(RepairAction::CreateTable, name, name, "table missing");
        if pass.repair(group, self.renderer.render_create_table(table))? {
            Ok(TableState::Created)
        } else {
            Ok(TableState::Missing)
        }
    }

    fn diff_columns(
        &self,
        table: &TableDefinition,
        actual: &TableDefinition,
        pass: &mut Pass,
    ) -> Result<()> {
        for column in table.columns.values() {
            let name = &column.column_name;

            let Some(existing) = actual.column(name) else {
                if self.capabilities.add_missing_columns {
                    let group = PlanGroup::new(
                        RepairAction::AddColumn,
                        &table.table_name,
                        name,
                        "column missing",
                    );
                    if !pass.repair(group, self.renderer.render_column_add(column))? {
                        pass.mark_column_absent(&table.table_name, name);
                    }
                } else {
                    pass.mark_column_absent(&table.table_name, name);
                    pass.find(
                        Finding::new(
                            FindingKind::MissingColumn,
                            TargetKind::Column,
                            &table.table_name,
                            name,
                        )
                        .expected(describe_column(column)),
                    );
                }
                continue;
            };

            let delta = ColumnDelta::between(self.renderer, existing, column);
            if delta.is_empty() {
                continue;
            }

            if self.capabilities.alter_incorrect_columns {
                let reason = delta.describe(self.renderer, existing, column);
                let group =
                    PlanGroup::new(RepairAction::AlterColumn, &table.table_name, name, &reason);
                pass.repair(group, self.renderer.render_column_alter(existing, column))?;
            } else {
                pass.find(
                    Finding::new(
                        FindingKind::IncorrectColumn,
                        TargetKind::Column,
                        &table.table_name,
                        name,
                    )
                    .expected(describe_column(column))
                    .actual(describe_column(existing)),
                );
            }
        }

        Ok(())
    }

    fn diff_indexes(
        &self,
        table: &TableDefinition,
        actual: &TableDefinition,
        pass: &mut Pass,
    ) -> Result<()> {
        for index in table.indexes.values() {
            let name = &index.index_name;

            // Databases name primary keys themselves
            let existing = if index.primary {
                actual.primary_index()
            } else {
                actual.index(name)
            };

            let Some(existing) = existing else {
                match (self.capabilities.add_missing_indexes, pass.index_dependency(&table.table_name, index)) {
                    (true, None) => {
                        let group = PlanGroup::new(
                            RepairAction::AddIndex,
                            &table.table_name,
                            name,
                            "index missing",
                        );
                        pass.repair(group, self.renderer.render_index_add(table, index))?;
                    }
                    (_, blocked) => {
                        let mut finding = Finding::new(
                            FindingKind::MissingIndex,
                            TargetKind::Index,
                            &table.table_name,
                            name,
                        )
                        .expected(describe_index(index));
                        if let Some(reason) = blocked {
                            finding = finding.actual(reason);
                        }
                        pass.find(finding);
                    }
                }
                continue;
            };

            if index_matches(index, existing) {
                continue;
            }

            let blocked = pass.index_dependency(&table.table_name, index);
            if let (true, Some(reason)) = (self.capabilities.repair_mismatched_indexes, blocked) {
                pass.find(
                    Finding::new(
                        FindingKind::MismatchedIndex,
                        TargetKind::Index,
                        &table.table_name,
                        name,
                    )
                    .expected(describe_index(index))
                    .actual(format!("{}; {}", describe_index(existing), reason)),
                );
            } else if self.capabilities.repair_mismatched_indexes {
                let reason = format!(
                    "{} -> {}",
                    describe_index(existing),
                    describe_index(index)
                );
                let group =
                    PlanGroup::new(RepairAction::RebuildIndex, &table.table_name, name, &reason);
                let rendered = self
                    .renderer
                    .render_index_drop(existing)
                    .and_then(|mut statements| {
                        statements.extend(self.renderer.render_index_add(table, index)?);
                        Ok(statements)
                    });
                pass.repair(group, rendered)?;
            } else {
                pass.find(
                    Finding::new(
                        FindingKind::MismatchedIndex,
                        TargetKind::Index,
                        &table.table_name,
                        name,
                    )
                    .expected(describe_index(index))
                    .actual(describe_index(existing)),
                );
            }
        }

        Ok(())
    }

    /// Foreign keys of a table this plan creates
    fn create_constraints(&self, table: &TableDefinition, pass: &mut Pass) -> Result<()> {
        for constraint in table.constraints.values() {
            self.sync_constraint(table, constraint, None, "table created", pass)?;
        }
        Ok(())
    }

    /// Emit or report one foreign key that is missing or differs
    fn sync_constraint(
        &self,
        table: &TableDefinition,
        constraint: &ConstraintDefinition,
        existing: Option<&ConstraintDefinition>,
        reason: &str,
        pass: &mut Pass,
    ) -> Result<()> {
        let name = &constraint.constraint_name;
        let blocked = pass.constraint_dependency(constraint);

        if self.capabilities.alter_incorrect_columns && blocked.is_none() {
            let group = PlanGroup::new(RepairAction::SyncConstraint, &table.table_name, name, reason);
            pass.repair(
                group,
                self.renderer.render_constraint_sync(existing, Some(constraint)),
            )?;
            return Ok(());
        }

        let mut finding = Finding::new(
            FindingKind::ConstraintDrift,
            TargetKind::Constraint,
            &table.table_name,
            name,
        )
        .expected(describe_constraint(constraint));
        let actual = match (existing.map(describe_constraint), blocked) {
            (Some(existing), Some(blocked)) => Some(format!("{}; {}", existing, blocked)),
            (Some(existing), None) => Some(existing),
            (None, blocked) => blocked,
        };
        if let Some(actual) = actual {
            finding = finding.actual(actual);
        }
        pass.find(finding);
        Ok(())
    }

    fn diff_constraints(
        &self,
        table: &TableDefinition,
        actual: &TableDefinition,
        pass: &mut Pass,
    ) -> Result<()> {
        for constraint in table.constraints.values() {
            let name = &constraint.constraint_name;
            let existing = actual.constraint(name);

            let reason = match existing {
                None => "constraint missing".to_string(),
                Some(existing) if !constraint_matches(constraint, existing) => format!(
                    "{} -> {}",
                    describe_constraint(existing),
                    describe_constraint(constraint)
                ),
                Some(_) => continue,
            };

            self.sync_constraint(table, constraint, existing, &reason, pass)?;
        }

        Ok(())
    }
}
