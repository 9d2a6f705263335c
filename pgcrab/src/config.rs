//! Configuration handling for pgcrab

use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::{Error, Result};
use crate::schema::tables::BaselineTable;
use crate::utils::identifiers::validate_identifier;

/// Maintenance database used for CREATE/DROP DATABASE
pub const DEFAULT_MAINTENANCE_DB: &str = "postgres";

/// Service principal receiving privileges on baseline tables
pub const DEFAULT_GRANT_PRINCIPAL: &str = "ivt";

/// Load configuration from a TOML file
pub fn load_from_file(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    config.validate()?;
    Ok(config)
}

/// Represents the complete pgcrab configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub baseline: BaselineConfig,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    /// Check every name that ends up inside DDL
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.database.dbname)?;
        validate_identifier(&self.database.user)?;
        validate_identifier(self.database.maintenance_db())?;
        validate_identifier(self.baseline.grant_to())?;
        self.baseline.tables()?;
        Ok(())
    }
}

/// Server connection parameters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    /// Falls back to the libpq environment (PGPASSWORD) when unset
    pub password: Option<String>,
    pub dbname: String,
    pub maintenance_db: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl DatabaseConfig {
    pub fn maintenance_db(&self) -> &str {
        self.maintenance_db.as_deref().unwrap_or(DEFAULT_MAINTENANCE_DB)
    }
}

/// Tables making up a fresh install, in creation order
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BaselineConfig {
    pub tables: Vec<String>,
    pub grant_to: Option<String>,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            tables: BaselineTable::ALL.iter().map(|t| t.name().to_string()).collect(),
            grant_to: None,
        }
    }
}

impl BaselineConfig {
    /// Resolve the configured names through the table allow-list
    pub fn tables(&self) -> Result<Vec<BaselineTable>> {
        self.tables.iter().map(|name| name.parse()).collect()
    }

    pub fn grant_to(&self) -> &str {
        self.grant_to.as_deref().unwrap_or(DEFAULT_GRANT_PRINCIPAL)
    }
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: "text".to_string(),
            stdout: true,
        }
    }
}
