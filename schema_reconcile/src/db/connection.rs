//! Database connection handling

use sqlx::{mysql::MySqlPoolOptions, MySql, Pool};
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::introspect::{MySqlIntrospector, SchemaSnapshot};

/// A live connection pool for a supported dialect
#[derive(Debug, Clone)]
pub enum DatabaseConnection {
    MySql(Pool<MySql>),
}

impl DatabaseConnection {
    /// Create a new database connection from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let dialect = config.dialect()?;
        let url = config.url.as_deref().ok_or_else(|| {
            Error::ConfigError(format!(
                "database.url is required to connect to {}",
                dialect
            ))
        })?;

        let pool_size = config.pool_size.unwrap_or(10);
        let timeout_seconds = config.timeout_seconds.unwrap_or(30);

        match dialect {
            Dialect::MySql => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(Duration::from_secs(timeout_seconds))
                    .connect(url)
                    .await?;

                tracing::info!(dialect = %dialect, pool_size, "Connected to database");
                Ok(DatabaseConnection::MySql(pool))
            }
            other => Err(Error::DatabaseError(format!(
                "No live driver for {}; reconcile it from a snapshot file instead",
                other
            ))),
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            DatabaseConnection::MySql(_) => Dialect::MySql,
        }
    }

    /// Introspect `table_names` over this connection
    pub async fn snapshot<'n>(
        &self,
        schema: Option<&str>,
        table_names: impl IntoIterator<Item = &'n str>,
    ) -> Result<SchemaSnapshot> {
        match self {
            DatabaseConnection::MySql(pool) => {
                MySqlIntrospector::new(pool, schema)
                    .snapshot(table_names)
                    .await
            }
        }
    }

    /// Execute a single SQL statement
    pub async fn execute(&self, sql: &str) -> Result<()> {
        match self {
            DatabaseConnection::MySql(pool) => {
                sqlx::query(sql).execute(pool).await?;
                Ok(())
            }
        }
    }
}
