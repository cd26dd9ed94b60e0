//! schema_reconcile: converge a live database onto a reference schema
//!
//! Reference files describe tables in logical terms. For a target dialect the
//! engine resolves them to concrete SQL types, diffs them against introspected
//! metadata, and produces an ordered repair plan of additive DDL plus a list
//! of findings it chose not to repair.

pub mod config;
pub mod db;
pub mod dialect;
pub mod error;
pub mod introspect;
pub mod plan;
pub mod reference;
pub mod schema;
pub mod utils;

use std::path::{Path, PathBuf};

pub use config::Config;
pub use db::connection::DatabaseConnection;
pub use db::executor::{ExecutionReport, PlanExecutor};
pub use dialect::{Dialect, DialectRenderer};
pub use error::{Error, Result};
pub use introspect::{Introspector, SchemaSnapshot};
pub use plan::{Finding, Reconciliation, RepairPlan};
pub use reference::ReferenceRegistry;
pub use schema::datatype::DatatypeCatalog;
pub use schema::reconciler::{Capabilities, Reconciler};
pub use schema::types::SchemaDefinition;

/// Initialize schema_reconcile with the specified configuration file
pub fn init(config_path: impl AsRef<Path>) -> Result<ReconcileClient> {
    let config = config::load_from_file(config_path)?;
    ReconcileClient::new(config)
}

/// The main client: one configuration, one dialect, one reference schema
pub struct ReconcileClient {
    config: Config,
    dialect: Dialect,
    reference: SchemaDefinition,
}

impl ReconcileClient {
    /// Load the reference files named by `config` and resolve them
    pub fn new(config: Config) -> Result<Self> {
        let dialect = config.database.dialect()?;
        let catalog = config.datatype_catalog()?;
        catalog.ensure_complete(dialect)?;

        let mut registry = ReferenceRegistry::new();
        registry.scan_and_register(&config.reference)?;
        let reference = registry.to_schema_definition(dialect, &catalog)?;

        tracing::info!(
            dialect = %dialect,
            tables = reference.tables.len(),
            "Loaded reference schema"
        );

        Ok(Self {
            config,
            dialect,
            reference,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn reference(&self) -> &SchemaDefinition {
        &self.reference
    }

    /// Diff the reference schema against `introspector`
    pub fn plan(&self, introspector: &dyn Introspector) -> Result<Reconciliation> {
        Reconciler::new(self.dialect.renderer(), self.config.capabilities)
            .reconcile(&self.reference, introspector)
    }

    pub async fn connect(&self) -> Result<DatabaseConnection> {
        DatabaseConnection::connect(&self.config.database).await
    }

    /// Introspect every reference table over a live connection
    pub async fn introspect(&self, connection: &DatabaseConnection) -> Result<SchemaSnapshot> {
        if connection.dialect() != self.dialect {
            return Err(Error::ConfigError(format!(
                "Connection is {} but the configured dialect is {}",
                connection.dialect(),
                self.dialect
            )));
        }

        let names = self.reference.tables.values().map(|t| t.table_name.as_str());
        connection
            .snapshot(self.config.database.schema.as_deref(), names)
            .await
    }

    /// Write the plan as a script into the configured output directory
    pub fn write_plan(&self, reconciliation: &Reconciliation) -> Result<PathBuf> {
        plan::script::write_script(
            Path::new(&self.config.output.directory),
            &reconciliation.plan,
            &reconciliation.findings,
            self.dialect,
        )
    }

    /// Apply a plan, or only log it when `output.dry_run` is set
    pub async fn apply(
        &self,
        connection: &DatabaseConnection,
        plan: &RepairPlan,
    ) -> Result<ExecutionReport> {
        if self.config.output.dry_run {
            for (i, statement) in plan.statements().enumerate() {
                tracing::info!(statement_number = i + 1, sql = statement, "Repair SQL (dry run)");
            }
            return Ok(ExecutionReport::default());
        }

        PlanExecutor::new(connection).execute(plan).await.into_result()
    }

    /// Complete workflow: introspect, plan, and apply
    pub async fn sync_database(&self) -> Result<Reconciliation> {
        let connection = self.connect().await?;
        let snapshot = self.introspect(&connection).await?;
        let reconciliation = self.plan(&snapshot)?;

        for finding in &reconciliation.findings {
            tracing::warn!(finding = %finding, "Unrepaired drift");
        }

        if reconciliation.plan.is_empty() {
            tracing::info!("Database schema is already in sync with the reference");
            return Ok(reconciliation);
        }

        if self.config.output.write_plan_files {
            self.write_plan(&reconciliation)?;
        }

        self.apply(&connection, &reconciliation.plan).await?;
        Ok(reconciliation)
    }
}
