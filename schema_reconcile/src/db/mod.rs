//! Database module for schema_reconcile
//!
//! Live connections and plan execution. Only MySQL is reachable live; other
//! dialects are reconciled from snapshot files and applied from scripts.

pub mod connection;
pub mod executor;

pub use connection::DatabaseConnection;
pub use executor::{ExecutionReport, PlanExecutor, StatementRunner};
