//! Configuration handling for schema_reconcile

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::schema::datatype::{DatatypeCatalog, DatatypeTemplate, LogicalType};
use crate::schema::reconciler::Capabilities;

/// Load configuration from a TOML file
pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    config.validate()?;
    Ok(config)
}

/// Represents the complete schema_reconcile configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub capabilities: Capabilities,
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub type_mapping: TypeMappingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    /// Check values serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        self.database.dialect()?;

        if self.reference.paths.is_empty() {
            return Err(Error::ConfigError(
                "reference.paths must name at least one file or directory".to_string(),
            ));
        }

        for mapping in &self.type_mapping.overrides {
            mapping.dialect.parse::<Dialect>()?;
            LogicalType::from_name(&mapping.logical, None)?;
        }

        Ok(())
    }

    /// The built-in catalog with the configured overrides applied
    pub fn datatype_catalog(&self) -> Result<DatatypeCatalog> {
        let mut catalog = DatatypeCatalog::builtin();
        self.type_mapping.apply(&mut catalog)?;
        Ok(catalog)
    }
}

/// Database connection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// `mysql`, `mssql`, `oracle` or `hsql`
    pub dialect: String,
    /// Only needed for live introspection and apply
    pub url: Option<String>,
    pub pool_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
    pub schema: Option<String>,
}

impl DatabaseConfig {
    pub fn dialect(&self) -> Result<Dialect> {
        self.dialect.parse()
    }
}

/// Reference schema discovery configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReferenceConfig {
    pub paths: Vec<String>,
    #[serde(default)]
    pub exclude_paths: Vec<String>,
    #[serde(default = "default_true")]
    pub recursive_scan: bool,
}

/// Type mapping configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TypeMappingConfig {
    #[serde(default)]
    pub overrides: Vec<TypeOverride>,
}

impl TypeMappingConfig {
    /// Register every override in `catalog`
    pub fn apply(&self, catalog: &mut DatatypeCatalog) -> Result<()> {
        for mapping in &self.overrides {
            let dialect: Dialect = mapping.dialect.parse()?;
            let logical = LogicalType::from_name(&mapping.logical, None)?;

            let mut template = DatatypeTemplate::new(&mapping.sql_type);
            if let Some(key_length) = mapping.key_length {
                template = template.keyed(key_length);
            }
            if mapping.castable == Some(false) {
                template = template.not_castable();
            }
            if let Some(reported) = &mapping.reported_type {
                template = template.reported_as(
                    mapping.reported_code.unwrap_or(logical.type_code()),
                    reported,
                    mapping.reported_length,
                );
            }

            catalog.register(dialect, logical.name(), template);
        }
        Ok(())
    }
}

/// Replacement for one (dialect, logical type) catalog entry
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TypeOverride {
    pub dialect: String,
    pub logical: String,
    /// DDL type; `{length}` is substituted for short_text
    pub sql_type: String,
    pub key_length: Option<u32>,
    pub castable: Option<bool>,
    pub reported_type: Option<String>,
    pub reported_code: Option<i32>,
    pub reported_length: Option<u32>,
}

/// Plan output configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: String,
    /// Log the plan instead of executing it
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub write_plan_files: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            dry_run: false,
            write_plan_files: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub file: Option<String>,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub stdout: bool,
}

fn default_true() -> bool {
    true
}

fn default_output_directory() -> String {
    "./plans".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}
