//! Plan execution
//!
//! Groups run in plan order and statements run in group order. DDL commits
//! implicitly on every supported database, so a failing group cannot be
//! rolled back; execution stops there and the report says how far it got.

use async_trait::async_trait;
use serde::Serialize;

use crate::db::connection::DatabaseConnection;
use crate::error::{Error, Result};
use crate::plan::RepairPlan;

/// Something that can run one SQL statement
#[async_trait]
pub trait StatementRunner {
    async fn run(&self, sql: &str) -> Result<()>;
}

#[async_trait]
impl StatementRunner for DatabaseConnection {
    async fn run(&self, sql: &str) -> Result<()> {
        self.execute(sql).await
    }
}

/// The statement that stopped execution
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionFailure {
    pub group_index: usize,
    pub table_name: String,
    pub target_name: String,
    pub statement: String,
    pub message: String,
}

/// Outcome of running a plan
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionReport {
    pub applied_groups: usize,
    pub applied_statements: usize,
    pub failure: Option<ExecutionFailure>,
}

impl ExecutionReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// `Err` carrying the failure, if any
    pub fn into_result(self) -> Result<Self> {
        match &self.failure {
            Some(failure) => Err(Error::ExecutionError(format!(
                "{}.{}: {} ({})",
                failure.table_name, failure.target_name, failure.message, failure.statement
            ))),
            None => Ok(self),
        }
    }
}

/// Runs repair plans against a [`StatementRunner`]
pub struct PlanExecutor<'a, R: StatementRunner + Sync> {
    runner: &'a R,
}

impl<'a, R: StatementRunner + Sync> PlanExecutor<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self { runner }
    }

    /// Execute every group of `plan`, stopping at the first failed statement
    pub async fn execute(&self, plan: &RepairPlan) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for (group_index, group) in plan.groups.iter().enumerate() {
            tracing::info!(
                action = %group.action,
                table = %group.table_name,
                target = %group.target_name,
                "Applying repair"
            );

            for statement in &group.statements {
                if let Err(e) = self.runner.run(statement).await {
                    tracing::error!(
                        table = %group.table_name,
                        target = %group.target_name,
                        error = %e,
                        "Repair failed"
                    );
                    report.failure = Some(ExecutionFailure {
                        group_index,
                        table_name: group.table_name.clone(),
                        target_name: group.target_name.clone(),
                        statement: statement.clone(),
                        message: e.to_string(),
                    });
                    return report;
                }
                report.applied_statements += 1;
            }

            report.applied_groups += 1;
        }

        report
    }
}
