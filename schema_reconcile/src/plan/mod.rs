//! Repair plans and findings
//!
//! A plan is the only output of a reconciliation pass that touches the
//! database: an ordered list of statement groups, each an atomic repair of one
//! object. Drift that is detected but not repaired is reported as a
//! [`Finding`] instead.

pub mod script;

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of schema object a group or finding is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Table,
    Column,
    Index,
    Constraint,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetKind::Table => "table",
            TargetKind::Column => "column",
            TargetKind::Index => "index",
            TargetKind::Constraint => "constraint",
        })
    }
}

/// What a plan group does to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairAction {
    CreateTable,
    AddColumn,
    AlterColumn,
    AddIndex,
    /// Drop followed by add, in one group
    RebuildIndex,
    SyncConstraint,
}

impl RepairAction {
    /// Position of this action in the global plan order
    pub fn phase(&self) -> u8 {
        match self {
            RepairAction::CreateTable => 0,
            RepairAction::AddColumn => 1,
            RepairAction::AlterColumn => 2,
            RepairAction::AddIndex | RepairAction::RebuildIndex => 3,
            RepairAction::SyncConstraint => 4,
        }
    }

    pub fn target_kind(&self) -> TargetKind {
        match self {
            RepairAction::CreateTable => TargetKind::Table,
            RepairAction::AddColumn | RepairAction::AlterColumn => TargetKind::Column,
            RepairAction::AddIndex | RepairAction::RebuildIndex => TargetKind::Index,
            RepairAction::SyncConstraint => TargetKind::Constraint,
        }
    }
}

impl fmt::Display for RepairAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RepairAction::CreateTable => "create table",
            RepairAction::AddColumn => "add column",
            RepairAction::AlterColumn => "alter column",
            RepairAction::AddIndex => "add index",
            RepairAction::RebuildIndex => "rebuild index",
            RepairAction::SyncConstraint => "sync constraint",
        })
    }
}

/// Statements repairing one object; executed as a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanGroup {
    pub target_kind: TargetKind,
    pub action: RepairAction,
    pub table_name: String,
    pub target_name: String,
    pub statements: Vec<String>,
    pub reason: String,
}

impl PlanGroup {
    pub fn new(action: RepairAction, table_name: &str, target_name: &str, reason: &str) -> Self {
        Self {
            target_kind: action.target_kind(),
            action,
            table_name: table_name.to_string(),
            target_name: target_name.to_string(),
            statements: Vec::new(),
            reason: reason.to_string(),
        }
    }

    pub fn with_statements(mut self, statements: Vec<String>) -> Self {
        self.statements = statements;
        self
    }
}

/// The ordered repair plan of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepairPlan {
    pub groups: Vec<PlanGroup>,
    /// Set when at least one table could not be introspected
    pub partial: bool,
}

impl RepairPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn statement_count(&self) -> usize {
        self.groups.iter().map(|group| group.statements.len()).sum()
    }

    /// Every statement in execution order
    pub fn statements(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|group| group.statements.iter().map(String::as_str))
    }

    /// Groups touching `table_name`, ignoring ASCII case
    pub fn groups_for<'a>(&'a self, table_name: &'a str) -> impl Iterator<Item = &'a PlanGroup> {
        self.groups
            .iter()
            .filter(move |group| group.table_name.eq_ignore_ascii_case(table_name))
    }
}

/// Why a finding was not turned into a repair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    MissingTable,
    MissingColumn,
    IncorrectColumn,
    MissingIndex,
    MismatchedIndex,
    ConstraintDrift,
    /// The dialect cannot express the repair
    Unrenderable,
    IntrospectionFailed,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FindingKind::MissingTable => "missing table",
            FindingKind::MissingColumn => "missing column",
            FindingKind::IncorrectColumn => "incorrect column",
            FindingKind::MissingIndex => "missing index",
            FindingKind::MismatchedIndex => "mismatched index",
            FindingKind::ConstraintDrift => "constraint drift",
            FindingKind::Unrenderable => "unrenderable",
            FindingKind::IntrospectionFailed => "introspection failed",
        })
    }
}

/// Drift that was detected but left in place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub target_kind: TargetKind,
    pub table_name: String,
    pub target_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl Finding {
    pub fn new(kind: FindingKind, target_kind: TargetKind, table_name: &str, target_name: &str) -> Self {
        Self {
            kind,
            target_kind,
            table_name: table_name.to_string(),
            target_name: target_name.to_string(),
            expected: None,
            actual: None,
        }
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.target_kind, self.table_name)?;
        if self.target_kind != TargetKind::Table {
            write!(f, ".{}", self.target_name)?;
        }
        if let Some(expected) = &self.expected {
            write!(f, " expected [{}]", expected)?;
        }
        if let Some(actual) = &self.actual {
            write!(f, " actual [{}]", actual)?;
        }
        Ok(())
    }
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub plan: RepairPlan,
    pub findings: Vec<Finding>,
}

impl Reconciliation {
    /// Nothing to repair and nothing left unrepaired
    pub fn is_clean(&self) -> bool {
        self.plan.is_empty() && self.findings.is_empty() && !self.plan.partial
    }
}
