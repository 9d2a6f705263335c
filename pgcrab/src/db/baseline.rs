//! Baseline initialization
//!
//! Brings an empty database to the minimum usable schema: the configured
//! tables plus one `initial_baseline` changelog row.

use crate::db::admin::Administrator;
use crate::error::Result;
use crate::schema::changelog::{BASELINE_NAME, BASELINE_PATCH};
use crate::schema::tables::BaselineTable;
use crate::utils::identifiers::validate_identifier;

/// Orchestrates a fresh install through an [`Administrator`]
pub struct Baseline<'a> {
    admin: &'a mut Administrator,
}

impl<'a> Baseline<'a> {
    pub fn new(admin: &'a mut Administrator) -> Self {
        Self { admin }
    }

    /// Drop, create and grant each table in the given order.
    ///
    /// No dependency resolution happens here: tables referenced by foreign
    /// keys (`roles`) must be listed before the tables referencing them
    /// (`users`).
    pub async fn create_tables(&mut self, tables: &[BaselineTable], principal: &str) -> Result<()> {
        // Reject the principal before anything is dropped
        let principal = validate_identifier(principal)?;

        tracing::info!(tables = ?tables, principal, "Creating baseline tables");
        for &table in tables {
            self.admin.drop_table(table).await?;
            self.admin.create_table(table).await?;
            self.admin.grant_access(table, principal).await?;
        }

        Ok(())
    }

    /// Insert the `initial_baseline` changelog row.
    ///
    /// Fails with [`crate::Error::UniquenessViolation`] when the database was
    /// already baselined; the transaction is rolled back either way.
    pub async fn insert_base_version(&mut self) -> Result<i32> {
        self.admin.insert_changelog(BASELINE_PATCH, BASELINE_NAME).await
    }
}
